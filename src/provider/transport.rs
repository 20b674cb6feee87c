use crate::error::{FetchCause, PotentialError, Result};
use reqwest::header::{ACCEPT_ENCODING, CONTENT_ENCODING};
use std::path::PathBuf;
use std::time::Duration;

pub const FILE_SCHEME: &str = "file://";

#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub content_encoding: Option<String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            content_encoding: None,
            body: body.into(),
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: 404,
            content_encoding: None,
            body: Vec::new(),
        }
    }
}

/// Get the raw bytes behind a URL. One attempt, no retries.
pub trait Transport {
    fn get(&self, url: &str) -> std::result::Result<RawResponse, FetchCause>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn get(&self, url: &str) -> std::result::Result<RawResponse, FetchCause> {
        (**self).get(url)
    }
}

pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| PotentialError::ConfigParse(format!("http client: {e}")))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> std::result::Result<RawResponse, FetchCause> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT_ENCODING, "gzip")
            .send()
            .map_err(|e| FetchCause::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let content_encoding = response
            .headers()
            .get(CONTENT_ENCODING)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .map_err(|e| FetchCause::Transport(e.to_string()))?
            .to_vec();
        Ok(RawResponse {
            status,
            content_encoding,
            body,
        })
    }
}

/// Serves `file://` URLs from a local mirror of the provider tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTransport;

impl Transport for FileTransport {
    fn get(&self, url: &str) -> std::result::Result<RawResponse, FetchCause> {
        let path = url
            .strip_prefix(FILE_SCHEME)
            .map(PathBuf::from)
            .ok_or_else(|| FetchCause::Transport(format!("not a file url: {url}")))?;
        match std::fs::read(&path) {
            Ok(body) => Ok(RawResponse::ok(body)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(RawResponse::not_found()),
            Err(e) => Err(FetchCause::Transport(format!("{}: {e}", path.display()))),
        }
    }
}

pub fn transport_for(base_url: &str, timeout: Duration, user_agent: &str) -> Result<Box<dyn Transport>> {
    if base_url.starts_with(FILE_SCHEME) {
        Ok(Box::new(FileTransport))
    } else {
        Ok(Box::new(HttpTransport::new(timeout, user_agent)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn file_transport_reads_and_reports_missing_as_404() {
        let dir = TempDir::new().expect("temp dir should be created");
        let path = dir.path().join("activity.json");
        fs::write(&path, r#"{"2025-01": 1.0}"#).expect("fixture should write");

        let found = FileTransport
            .get(&format!("{FILE_SCHEME}{}", path.display()))
            .expect("existing file should load");
        assert_eq!(found.status, 200);
        assert_eq!(found.body, br#"{"2025-01": 1.0}"#);

        let missing = FileTransport
            .get(&format!("{FILE_SCHEME}{}", dir.path().join("nope.json").display()))
            .expect("missing file is a response, not a transport error");
        assert_eq!(missing.status, 404);
    }

    #[test]
    fn file_transport_rejects_other_schemes() {
        assert!(matches!(
            FileTransport.get("https://example.com/a.json"),
            Err(FetchCause::Transport(_))
        ));
    }
}
