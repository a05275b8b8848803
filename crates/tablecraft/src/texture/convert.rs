//! Legacy camera photos (HEIC/HEIF).
//!
//! Phones save photos as HEIF containers, which the decoder can't read. When
//! the fetched bytes look like one, they are piped through an external
//! converter (ImageMagick by default) that emits PNG. The conversion races a
//! fixed timeout; losing the race counts as a failure and the surface falls
//! back to its solid color.
//!
//! ```text
//!   bytes ──► is_legacy_photo? ──no──► decode
//!                 │yes
//!                 ▼
//!   spawn converter ──► feed stdin, drain stdout/stderr on helper threads
//!       │
//!       └─ try_wait every 10ms ── exited ──► PNG bytes or Conversion error
//!                │ deadline passed / token canceled
//!                ▼
//!           kill + wait ──► ConversionTimeout / Canceled
//! ```
//!
//! The child is always reaped and the helper threads joined before
//! `convert` returns, whichever way it returns.

use std::io::{Read, Write};
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::TextureError;
use crate::task::CancelToken;

/// Default conversion budget.
pub const DEFAULT_CONVERSION_TIMEOUT: Duration = Duration::from_secs(8);

/// How often a running converter is checked for exit, deadline and cancel.
const CHILD_POLL_STEP: Duration = Duration::from_millis(10);

/// ISO-BMFF major brands used by HEIC/HEIF stills and sequences.
const HEIF_BRANDS: [&[u8; 4]; 7] = [b"heic", b"heix", b"hevc", b"heim", b"heis", b"mif1", b"msf1"];

/// True if `bytes` (or the file-name extension `hint`) indicate a HEIF photo.
pub fn is_legacy_photo(bytes: &[u8], hint: Option<&str>) -> bool {
    if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" {
        let brand = &bytes[8..12];
        if HEIF_BRANDS.iter().any(|b| b.as_slice() == brand) {
            return true;
        }
    }
    matches!(hint, Some("heic" | "heif"))
}

pub trait LegacyConverter: Send + Sync {
    /// Convert a HEIF payload into bytes the image decoder understands.
    ///
    /// Must give up with [`TextureError::ConversionTimeout`] once `timeout`
    /// has passed and with [`TextureError::Canceled`] once `token` is
    /// canceled, releasing everything it started.
    fn convert(&self, bytes: &[u8], timeout: Duration, token: &CancelToken) -> Result<Vec<u8>, TextureError>;
}

/// Runs an external program that reads HEIF on stdin and writes PNG to stdout.
#[derive(Debug, Clone)]
pub struct CommandConverter {
    program: String,
    args: Vec<String>,
}

impl CommandConverter {
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for CommandConverter {
    fn default() -> Self {
        Self::new("magick", ["heic:-", "png:-"])
    }
}

impl LegacyConverter for CommandConverter {
    fn convert(&self, bytes: &[u8], timeout: Duration, token: &CancelToken) -> Result<Vec<u8>, TextureError> {
        let deadline = Instant::now() + timeout;
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| TextureError::Conversion(format!("cannot run `{}`: {e}", self.program)))?;

        let io = match ChildIo::start(&mut child, bytes.to_vec()) {
            Ok(io) => io,
            Err(e) => {
                reap(&mut child, &self.program);
                return Err(e);
            }
        };

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    reap(&mut child, &self.program);
                    io.finish();
                    return Err(TextureError::Conversion(e.to_string()));
                }
            }
            let abandon = if token.is_canceled() {
                Some(TextureError::Canceled)
            } else if Instant::now() >= deadline {
                Some(TextureError::ConversionTimeout(timeout))
            } else {
                None
            };
            if let Some(error) = abandon {
                reap(&mut child, &self.program);
                io.finish();
                return Err(error);
            }
            thread::sleep(CHILD_POLL_STEP.min(deadline.saturating_duration_since(Instant::now())));
        };

        let (stdout, stderr) = io.finish();
        if !status.success() {
            return Err(TextureError::Conversion(format!(
                "`{}` exited with {status}: {}",
                self.program,
                String::from_utf8_lossy(&stderr).trim()
            )));
        }
        Ok(stdout)
    }
}

/// Kill the child (if still running) and wait for it so no zombie is left.
fn reap(child: &mut Child, program: &str) {
    if let Err(e) = child.kill() {
        log::debug!("`{program}` already gone: {e}");
    }
    if let Err(e) = child.wait() {
        log::warn!("Could not reap `{program}`: {e}");
    }
}

/// Helper threads around the child's pipes. Separate threads keep a full
/// stdout pipe from blocking the stdin write.
struct ChildIo {
    writer: JoinHandle<std::io::Result<()>>,
    stdout: JoinHandle<Vec<u8>>,
    stderr: JoinHandle<Vec<u8>>,
}

impl ChildIo {
    fn start(child: &mut Child, input: Vec<u8>) -> Result<Self, TextureError> {
        let missing = |what: &str| TextureError::Conversion(format!("converter {what} unavailable"));
        let mut stdin = child.stdin.take().ok_or_else(|| missing("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| missing("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| missing("stderr"))?;

        // Dropping stdin at the end of the closure closes the pipe.
        let writer = thread::spawn(move || stdin.write_all(&input));
        Ok(Self {
            writer,
            stdout: thread::spawn(move || read_all(stdout)),
            stderr: thread::spawn(move || read_all(stderr)),
        })
    }

    /// Join the helpers. Only call once the child has exited or been killed,
    /// so the pipes are closed.
    fn finish(self) -> (Vec<u8>, Vec<u8>) {
        if let Ok(Err(e)) = self.writer.join() {
            log::debug!("Converter closed stdin early: {e}");
        }
        let stdout = self.stdout.join().unwrap_or_default();
        let stderr = self.stderr.join().unwrap_or_default();
        (stdout, stderr)
    }
}

fn read_all(mut pipe: impl Read) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Err(e) = pipe.read_to_end(&mut buf) {
        log::debug!("Converter pipe read failed: {e}");
    }
    buf
}
