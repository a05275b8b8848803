//! Where texture bytes come from.
//!
//! [`ImageSource`] is the seam tests use to control timing; the
//! [`StandardImageSource`] reads bundled files from disk and, with the
//! `remote` feature, fetches catalog photos over HTTP. Both read in chunks and
//! check the cancel token between chunks.

use std::io::Read;

use super::TextureError;
use crate::catalog::TextureLocation;
use crate::task::CancelToken;

const CHUNK_SIZE: usize = 64 * 1024;

pub trait ImageSource: Send + Sync {
    fn fetch(&self, location: &TextureLocation, token: &CancelToken) -> Result<Vec<u8>, TextureError>;
}

/// Bundled files from disk, remote photos over blocking HTTP.
pub struct StandardImageSource {
    #[cfg(feature = "remote")]
    client: reqwest::blocking::Client,
}

impl StandardImageSource {
    pub fn new() -> Result<Self, TextureError> {
        Ok(Self {
            #[cfg(feature = "remote")]
            client: reqwest::blocking::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .map_err(|e| TextureError::Http {
                    url: String::new(),
                    reason: e.to_string(),
                })?,
        })
    }

    #[cfg(feature = "remote")]
    fn fetch_remote(&self, url: &str, token: &CancelToken) -> Result<Vec<u8>, TextureError> {
        let http_error = |e: reqwest::Error| TextureError::Http {
            url: url.to_string(),
            reason: e.to_string(),
        };
        let response = self
            .client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(http_error)?;
        read_cancelable(response, url, token)
    }

    #[cfg(not(feature = "remote"))]
    fn fetch_remote(&self, url: &str, _token: &CancelToken) -> Result<Vec<u8>, TextureError> {
        Err(TextureError::RemoteDisabled(url.to_string()))
    }
}

impl ImageSource for StandardImageSource {
    fn fetch(&self, location: &TextureLocation, token: &CancelToken) -> Result<Vec<u8>, TextureError> {
        match location {
            TextureLocation::Bundled(path) => {
                let file = std::fs::File::open(path).map_err(|source| TextureError::Io {
                    location: path.display().to_string(),
                    source,
                })?;
                read_cancelable(file, &path.display().to_string(), token)
            }
            TextureLocation::Remote(url) if url.starts_with("http://") || url.starts_with("https://") => {
                self.fetch_remote(url, token)
            }
            TextureLocation::Remote(url) => Err(TextureError::Http {
                url: url.clone(),
                reason: "relative URL; set an absolute dev proxy prefix".into(),
            }),
        }
    }
}

/// Read `reader` to the end in fixed-size chunks, stopping early if canceled.
pub fn read_cancelable(mut reader: impl Read, location: &str, token: &CancelToken) -> Result<Vec<u8>, TextureError> {
    let mut out = Vec::new();
    let mut chunk = vec![0u8; CHUNK_SIZE];
    loop {
        if token.is_canceled() {
            return Err(TextureError::Canceled);
        }
        match reader.read(&mut chunk) {
            Ok(0) => return Ok(out),
            Ok(n) => out.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(source) => {
                return Err(TextureError::Io {
                    location: location.to_string(),
                    source,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_everything_across_chunks() {
        let data: Vec<u8> = (0..CHUNK_SIZE * 2 + 17).map(|i| (i % 251) as u8).collect();
        let out = read_cancelable(std::io::Cursor::new(data.clone()), "mem", &CancelToken::new()).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn canceled_read_returns_canceled() {
        let token = CancelToken::new();
        token.cancel();
        let result = read_cancelable(std::io::Cursor::new(vec![1, 2, 3]), "mem", &token);
        assert!(matches!(result, Err(TextureError::Canceled)));
    }

    #[test]
    fn bundled_file_is_read_from_disk() {
        let dir = std::env::temp_dir().join(format!("tablecraft-source-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("stone.bin");
        std::fs::write(&path, b"stone").unwrap();

        let source = StandardImageSource::new().unwrap();
        let bytes = source
            .fetch(&TextureLocation::Bundled(path.clone()), &CancelToken::new())
            .unwrap();
        assert_eq!(bytes, b"stone");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let source = StandardImageSource::new().unwrap();
        let result = source.fetch(
            &TextureLocation::Bundled("/definitely/not/here.jpg".into()),
            &CancelToken::new(),
        );
        assert!(matches!(result, Err(TextureError::Io { .. })));
    }

    #[test]
    fn relative_remote_url_is_rejected() {
        let source = StandardImageSource::new().unwrap();
        let result = source.fetch(&TextureLocation::Remote("/api/allinstone/x.jpg".into()), &CancelToken::new());
        assert!(matches!(result, Err(TextureError::Http { .. })));
    }
}
