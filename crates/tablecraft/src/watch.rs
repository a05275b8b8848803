//! # Settings Hot Reload
//!
//! The viewer watches its settings file and rebuilds the table when the file
//! is saved. Tweak a radius in an editor, hit save, and the new top appears
//! without restarting.
//!
//! ```text
//! notify thread ──► mpsc ──► SettingsWatcher::poll(now)   (once per frame)
//!                              │ keep events for our file name
//!                              │ restart the 100ms quiet timer
//!                              ▼
//!                            quiet long enough? ──► Settings::load
//! ```
//!
//! ## Atomic Saves
//!
//! Editors often save atomically: write a temporary file, then rename it
//! over the original. The original inode disappears, so a watch on the
//! file itself goes silent after the first save. Watching the parent
//! directory and filtering on the file name survives renames.
//!
//! ## Graceful Degradation
//!
//! A watcher that fails to start is logged and hot reload is simply off.
//! The viewer keeps running with the settings it started with.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::config::{ConfigError, Settings};

/// Quiet time required after the last event before the file is re-read.
pub const DEBOUNCE_DURATION: Duration = Duration::from_millis(100);

/// Collapses a burst of events into one trigger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Debounce {
    last_event: Option<Instant>,
}

impl Debounce {
    /// Record an event. Restarts the quiet timer.
    pub fn note(&mut self, at: Instant) {
        self.last_event = Some(at);
    }

    pub fn is_pending(&self) -> bool {
        self.last_event.is_some()
    }

    /// True once, when the last event is at least [`DEBOUNCE_DURATION`] old.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.last_event {
            Some(at) if now.saturating_duration_since(at) >= DEBOUNCE_DURATION => {
                self.last_event = None;
                true
            }
            _ => false,
        }
    }
}

pub struct SettingsWatcher {
    path: PathBuf,
    file_name: Option<std::ffi::OsString>,
    /// `None` if the watcher failed to start.
    watcher: Option<RecommendedWatcher>,
    rx: mpsc::Receiver<Result<notify::Event, notify::Error>>,
    debounce: Debounce,
    rx_disconnected: bool,
}

impl SettingsWatcher {
    /// Start watching `path`. Never fails; problems disable hot reload.
    pub fn new(path: &Path) -> Self {
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let file_name = path.file_name().map(|f| f.to_os_string());
        let (tx, rx) = mpsc::channel();

        let watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        });

        let watcher = match watcher {
            Ok(mut w) => {
                let dir = path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or_else(|| Path::new("."));
                match w.watch(dir, RecursiveMode::NonRecursive) {
                    Ok(()) => {
                        log::info!("Watching {} for settings changes", path.display());
                        Some(w)
                    }
                    Err(e) => {
                        log::warn!("Failed to watch '{}': {e}. Hot reload disabled.", dir.display());
                        None
                    }
                }
            }
            Err(e) => {
                log::warn!("Failed to create file watcher: {e}. Hot reload disabled.");
                None
            }
        };

        Self {
            path,
            file_name,
            watcher,
            rx,
            debounce: Debounce::default(),
            rx_disconnected: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_active(&self) -> bool {
        self.watcher.is_some() && !self.rx_disconnected
    }

    /// Drain watcher events and re-read the file once it has been quiet for
    /// [`DEBOUNCE_DURATION`]. Returns `None` when there is nothing new.
    pub fn poll(&mut self, now: Instant) -> Option<Result<Settings, ConfigError>> {
        self.drain_events(now);
        if !self.debounce.fire(now) {
            return None;
        }
        let result = Settings::load(&self.path);
        match &result {
            Ok(_) => log::info!("Reloaded settings from {}", self.path.display()),
            Err(e) => log::warn!("Keeping previous settings: {e}"),
        }
        Some(result)
    }

    fn drain_events(&mut self, now: Instant) {
        if self.rx_disconnected {
            return;
        }
        loop {
            match self.rx.try_recv() {
                Ok(Ok(event)) => {
                    if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
                        && event.paths.iter().any(|p| self.is_our_file(p))
                    {
                        self.debounce.note(now);
                    }
                }
                Ok(Err(e)) => log::warn!("File watcher error: {e}"),
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    if self.watcher.is_some() {
                        log::warn!("File watcher disconnected. Hot reload disabled.");
                    }
                    self.rx_disconnected = true;
                    break;
                }
            }
        }
    }

    fn is_our_file(&self, path: &Path) -> bool {
        path.file_name().is_some() && path.file_name() == self.file_name.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debounce_waits_for_quiet_time() {
        let t0 = Instant::now();
        let mut d = Debounce::default();
        assert!(!d.fire(t0), "nothing noted yet");

        d.note(t0);
        assert!(!d.fire(t0 + Duration::from_millis(50)));
        d.note(t0 + Duration::from_millis(60));
        assert!(
            !d.fire(t0 + Duration::from_millis(120)),
            "second event restarted the timer"
        );
        assert!(d.fire(t0 + Duration::from_millis(160)));
        assert!(!d.fire(t0 + Duration::from_millis(500)), "fires once per burst");
        assert!(!d.is_pending());
    }

    #[test]
    fn only_the_watched_file_name_matches() {
        let dir = std::env::temp_dir().join(format!("tablecraft-watch-name-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.json");
        std::fs::write(&path, "{}").unwrap();

        let watcher = SettingsWatcher::new(&path);
        assert!(watcher.is_our_file(&dir.join("settings.json")));
        assert!(!watcher.is_our_file(&dir.join("settings.json.tmp")));
        assert!(!watcher.is_our_file(&dir.join("other.json")));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn saving_the_file_produces_new_settings() {
        let dir = std::env::temp_dir().join(format!("tablecraft-watch-save-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.json");
        std::fs::write(&path, "{}").unwrap();

        let mut watcher = SettingsWatcher::new(&path);
        if !watcher.is_active() {
            // No filesystem notifications in this environment.
            let _ = std::fs::remove_dir_all(&dir);
            return;
        }

        std::fs::write(&path, r#"{ "table": { "radius": 75 } }"#).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut reloaded = None;
        while Instant::now() < deadline {
            if let Some(result) = watcher.poll(Instant::now()) {
                reloaded = Some(result);
                break;
            }
            std::thread::sleep(Duration::from_millis(20));
        }

        let settings = reloaded
            .expect("watcher should report the change within 5s")
            .expect("new file parses");
        assert_eq!(settings.table.radius, 75.0);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
