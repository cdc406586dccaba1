//! Trait abstraction for NFC tag technology operations to enable testing

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::ErrorKind;

/// Trait for NFC tag I/O operations
///
/// Every call to `request_technology` must be paired with exactly one call
/// to `release_technology`, whatever the outcome of the session.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TagTransport: Send {
    /// Wait for a tag and engage the NDEF technology
    async fn request_technology(&mut self) -> io::Result<()>;

    /// Read the raw NDEF message, `None` if the tag carries none
    async fn read_message(&mut self) -> io::Result<Option<Vec<u8>>>;

    /// Commit a raw NDEF message to the tag
    async fn write_message(&mut self, message: &[u8]) -> io::Result<()>;

    /// Release the technology; releasing an idle handle is not an error
    async fn release_technology(&mut self) -> io::Result<()>;
}

/// Classify a handshake or retrieval error
///
/// Interrupted operations and errors mentioning cancellation are treated as
/// a user cancel; anything else is a hardware failure.
pub fn classify_io_error(error: &io::Error) -> ErrorKind {
    if error.kind() == io::ErrorKind::Interrupted
        || error.to_string().to_lowercase().contains("cancel")
    {
        ErrorKind::Cancelled
    } else {
        ErrorKind::HardwareFailure
    }
}

/// Tag transport backed by a tag image file
///
/// The file holds the raw NDEF message of a tag. A missing file means no
/// tag is in range; `request_technology` polls until one appears. An empty
/// file is a tag without an NDEF message.
#[derive(Debug)]
pub struct FileTagTransport {
    path: PathBuf,
    poll_interval: Duration,
    engaged: bool,
}

impl FileTagTransport {
    pub fn new<P: AsRef<Path>>(path: P, poll_interval: Duration) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            poll_interval,
            engaged: false,
        }
    }

    /// Path of the tag image
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the technology is currently engaged
    pub fn is_engaged(&self) -> bool {
        self.engaged
    }

    fn ensure_engaged(&self) -> io::Result<()> {
        if self.engaged {
            Ok(())
        } else {
            Err(io::Error::new(io::ErrorKind::NotConnected, "NDEF technology not requested"))
        }
    }
}

#[async_trait]
impl TagTransport for FileTagTransport {
    async fn request_technology(&mut self) -> io::Result<()> {
        if self.engaged {
            return Err(io::Error::new(io::ErrorKind::AlreadyExists, "NDEF technology already engaged"));
        }

        loop {
            match tokio::fs::metadata(&self.path).await {
                Ok(meta) if meta.is_file() => break,
                Ok(_) => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("{} is not a tag image file", self.path.display()),
                    ))
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    tokio::time::sleep(self.poll_interval).await;
                }
                Err(e) => return Err(e),
            }
        }

        debug!("Tag detected at {}", self.path.display());
        self.engaged = true;
        Ok(())
    }

    async fn read_message(&mut self) -> io::Result<Option<Vec<u8>>> {
        self.ensure_engaged()?;
        let bytes = tokio::fs::read(&self.path).await?;
        Ok(if bytes.is_empty() { None } else { Some(bytes) })
    }

    async fn write_message(&mut self, message: &[u8]) -> io::Result<()> {
        self.ensure_engaged()?;
        tokio::fs::write(&self.path, message).await
    }

    async fn release_technology(&mut self) -> io::Result<()> {
        self.engaged = false;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_classify_io_error() {
        let cancelled = io::Error::new(io::ErrorKind::Other, "User Cancelled the request");
        assert_eq!(classify_io_error(&cancelled), ErrorKind::Cancelled);

        let interrupted = io::Error::from(io::ErrorKind::Interrupted);
        assert_eq!(classify_io_error(&interrupted), ErrorKind::Cancelled);

        let broken = io::Error::new(io::ErrorKind::BrokenPipe, "tag lost");
        assert_eq!(classify_io_error(&broken), ErrorKind::HardwareFailure);
    }

    #[test]
    fn test_mock_tag_tracks_handle() {
        let tag = mocks::MockTag::with_message(vec![0xD1]);
        let mut transport = tag.clone();

        tokio_test::block_on(async {
            transport.request_technology().await.unwrap();
            assert!(tag.is_held());
            assert_eq!(transport.read_message().await.unwrap(), Some(vec![0xD1]));
            transport.release_technology().await.unwrap();
        });

        assert!(!tag.is_held());
        assert_eq!(tag.acquire_calls(), 1);
        assert_eq!(tag.release_calls(), 1);
        assert_eq!(tag.overlaps(), 0);
    }

    #[tokio::test]
    async fn test_file_transport_read_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tag.ndef");
        std::fs::write(&path, b"").unwrap();

        let mut transport = FileTagTransport::new(&path, Duration::from_millis(5));
        transport.request_technology().await.unwrap();
        assert!(transport.is_engaged());
        assert_eq!(transport.read_message().await.unwrap(), None);

        transport.write_message(&[0xD1, 0x01]).await.unwrap();
        assert_eq!(transport.read_message().await.unwrap(), Some(vec![0xD1, 0x01]));

        transport.release_technology().await.unwrap();
        assert!(!transport.is_engaged());
        // Releasing twice is fine
        transport.release_technology().await.unwrap();
    }

    #[tokio::test]
    async fn test_file_transport_requires_engagement() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tag.ndef");
        std::fs::write(&path, b"x").unwrap();

        let mut transport = FileTagTransport::new(&path, Duration::from_millis(5));
        let err = transport.read_message().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
        assert!(transport.write_message(b"y").await.is_err());
    }

    #[tokio::test]
    async fn test_file_transport_waits_for_tag() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tag.ndef");

        let mut transport = FileTagTransport::new(&path, Duration::from_millis(5));
        let waited = tokio::time::timeout(Duration::from_millis(50), transport.request_technology()).await;
        assert!(waited.is_err(), "should still be waiting for a tag");
        assert!(!transport.is_engaged());

        std::fs::write(&path, b"x").unwrap();
        tokio::time::timeout(Duration::from_secs(2), transport.request_technology())
            .await
            .expect("tag should be detected")
            .unwrap();
        assert!(transport.is_engaged());
    }

    #[tokio::test]
    async fn test_file_transport_rejects_directory() {
        let dir = tempdir().unwrap();
        let mut transport = FileTagTransport::new(dir.path(), Duration::from_millis(5));
        let err = transport.request_technology().await.unwrap_err();
        assert_eq!(classify_io_error(&err), ErrorKind::HardwareFailure);
    }
}
