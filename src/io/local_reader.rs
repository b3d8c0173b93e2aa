use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, BufReader};

use super::byte_reader::ByteReader;
use crate::error::{LoadError, Result};

/// ByteReader implementation for local files
#[derive(Clone)]
pub struct LocalFileByteReader {
    file_path: PathBuf,
}

impl LocalFileByteReader {
    pub fn new(file_path: impl AsRef<Path>) -> Self {
        Self {
            file_path: file_path.as_ref().to_path_buf(),
        }
    }

    async fn open(&self) -> Result<File> {
        File::open(&self.file_path).await.map_err(|e| {
            let reason = if e.kind() == std::io::ErrorKind::NotFound {
                "file not found".to_string()
            } else {
                format!("failed to open file: {}", e)
            };
            LoadError::source_file(&self.file_path, reason)
        })
    }

    fn read_error(&self, e: std::io::Error) -> LoadError {
        LoadError::source_file(&self.file_path, format!("failed to read file: {}", e))
    }
}

#[async_trait]
impl ByteReader for LocalFileByteReader {
    fn location(&self) -> &Path {
        &self.file_path
    }

    async fn size(&self) -> Result<u64> {
        let file = self.open().await?;
        let metadata = file.metadata().await.map_err(|e| self.read_error(e))?;
        if metadata.is_dir() {
            return Err(LoadError::source_file(
                &self.file_path,
                "path is a directory, not a file",
            ));
        }
        Ok(metadata.len())
    }

    async fn read_range(&self, start: u64, end: u64) -> Result<Vec<u8>> {
        let file = self.open().await?;

        let mut file = BufReader::new(file);
        file.seek(std::io::SeekFrom::Start(start))
            .await
            .map_err(|e| self.read_error(e))?;

        let size = (end - start) as usize;
        let mut buffer = vec![0u8; size];
        file.read_exact(&mut buffer)
            .await
            .map_err(|e| self.read_error(e))?;

        Ok(buffer)
    }
}
