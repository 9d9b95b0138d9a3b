/// Stage area for inbound uploads
///
/// Each upload is copied in full into its own temporary file before it is
/// handed to a storage backend. The backing file is owned by a `TempPath`,
/// so it is unlinked when the `StagedUpload` is dropped: on success, on any
/// early return, on panic and when the request future is cancelled.
use crate::error::{TubelyError, TubelyResult};
use std::io::SeekFrom;
use std::path::Path;
use tempfile::TempPath;
use tokio::fs::{self, File};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

const CHUNK_SIZE: usize = 64 * 1024;

/// A fully received upload, rewound and ready to be read again
#[derive(Debug)]
pub struct StagedUpload {
    file: File,
    path: TempPath,
    len: u64,
}

impl StagedUpload {
    /// Copy `reader` into a new temporary file under `dir`.
    ///
    /// Fails with `PayloadTooLarge` as soon as more than `max_bytes` have been
    /// read; the partial file is removed before the error is returned.
    pub async fn stage<R>(dir: &Path, mut reader: R, max_bytes: u64) -> TubelyResult<Self>
    where
        R: AsyncRead + Unpin,
    {
        fs::create_dir_all(dir).await.map_err(|e| {
            TubelyError::StagingFailed(format!("Failed to create stage directory: {}", e))
        })?;

        let (std_file, path) = tempfile::Builder::new()
            .prefix("tubely-upload-")
            .tempfile_in(dir)
            .map_err(|e| TubelyError::StagingFailed(format!("Failed to create stage file: {}", e)))?
            .into_parts();
        let mut file = File::from_std(std_file);

        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut len: u64 = 0;
        loop {
            let n = reader.read(&mut buf).await.map_err(|e| {
                TubelyError::MalformedRequest(format!("Failed to read upload body: {}", e))
            })?;
            if n == 0 {
                break;
            }

            len += n as u64;
            if len > max_bytes {
                tracing::debug!(max_bytes, path = %path.display(), "Upload exceeded size ceiling");
                return Err(TubelyError::PayloadTooLarge { max_bytes });
            }

            file.write_all(&buf[..n]).await.map_err(|e| {
                TubelyError::StagingFailed(format!("Failed to write stage file: {}", e))
            })?;
        }

        file.flush()
            .await
            .map_err(|e| TubelyError::StagingFailed(format!("Failed to flush stage file: {}", e)))?;

        let mut staged = Self { file, path, len };
        staged.rewind().await?;

        tracing::debug!(size_bytes = len, path = %staged.path().display(), "Upload staged");
        Ok(staged)
    }

    /// Reset the cursor to the start of the staged content
    pub async fn rewind(&mut self) -> TubelyResult<()> {
        self.file
            .seek(SeekFrom::Start(0))
            .await
            .map_err(|e| TubelyError::StagingFailed(format!("Failed to rewind stage file: {}", e)))?;
        Ok(())
    }

    /// Number of staged bytes
    pub fn size(&self) -> u64 {
        self.len
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reader over the staged bytes, positioned at the start
    pub fn reader(&mut self) -> &mut File {
        &mut self.file
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use tempfile::tempdir;

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn test_stage_round_trip() {
        let dir = tempdir().unwrap();
        let data = b"some staged video bytes".to_vec();

        let mut staged = StagedUpload::stage(dir.path(), &data[..], 1024).await.unwrap();
        assert_eq!(staged.size(), data.len() as u64);

        let mut read_back = Vec::new();
        staged.reader().read_to_end(&mut read_back).await.unwrap();
        assert_eq!(read_back, data);
    }

    #[tokio::test]
    async fn test_stage_empty_input() {
        let dir = tempdir().unwrap();

        let mut staged = StagedUpload::stage(dir.path(), &b""[..], 1024).await.unwrap();
        assert_eq!(staged.size(), 0);

        let mut read_back = Vec::new();
        staged.reader().read_to_end(&mut read_back).await.unwrap();
        assert!(read_back.is_empty());
    }

    #[tokio::test]
    async fn test_stage_file_removed_on_drop() {
        let dir = tempdir().unwrap();

        let staged = StagedUpload::stage(dir.path(), &b"12345"[..], 1024).await.unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());

        drop(staged);
        assert!(!path.exists());
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_stage_exactly_at_limit() {
        let dir = tempdir().unwrap();
        let staged = StagedUpload::stage(dir.path(), &b"12345"[..], 5).await.unwrap();
        assert_eq!(staged.size(), 5);
    }

    #[tokio::test]
    async fn test_stage_oversize_removes_partial_file() {
        let dir = tempdir().unwrap();
        let data = vec![7u8; 4096];

        let result = StagedUpload::stage(dir.path(), &data[..], 100).await;
        assert!(matches!(
            result,
            Err(TubelyError::PayloadTooLarge { max_bytes: 100 })
        ));
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_stage_reader_failure_removes_partial_file() {
        let dir = tempdir().unwrap();
        let reader = tokio_test::io::Builder::new()
            .read(b"first chunk")
            .read_error(io::Error::new(io::ErrorKind::ConnectionReset, "client went away"))
            .build();

        let result = StagedUpload::stage(dir.path(), reader, 1024).await;
        assert!(matches!(result, Err(TubelyError::MalformedRequest(_))));
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_concurrent_stages_are_independent() {
        let dir = tempdir().unwrap();

        let (a, b) = tokio::join!(
            StagedUpload::stage(dir.path(), &b"aaaa"[..], 1024),
            StagedUpload::stage(dir.path(), &b"bb"[..], 1024),
        );
        let (mut a, mut b) = (a.unwrap(), b.unwrap());
        assert_ne!(a.path(), b.path());

        let mut buf = Vec::new();
        a.reader().read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"aaaa");
        buf.clear();
        b.reader().read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"bb");
    }
}
