use async_trait::async_trait;
use std::path::Path;

use crate::config::SOURCE_DELIMITER;
use crate::error::Result;

/// A single record (row) from the file
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// 1-based line number in the source file
    pub line_number: u64,
    pub fields: Vec<String>,
}

/// Everything parsed from one source file
#[derive(Debug)]
pub struct SourceData {
    /// Header row, when the format declares one
    pub header: Option<Vec<String>>,
    pub records: Vec<Record>,
    pub bytes_read: u64,
}

/// Trait for reading a delimited source into raw string rows
#[async_trait]
pub trait SourceReader: Send + Sync {
    /// Path (or label) of the source, used in diagnostics
    fn location(&self) -> &Path;

    /// Read and split every row of the source
    async fn read_all(&self) -> Result<SourceData>;
}

/// Configuration for delimited file reading
#[derive(Debug, Clone)]
pub struct DelimitedConfig {
    pub delimiter: u8,
    pub has_header: bool,
    /// Quote character; `None` splits on the delimiter with no quote handling
    pub quote: Option<u8>,
}

impl Default for DelimitedConfig {
    fn default() -> Self {
        Self {
            delimiter: SOURCE_DELIMITER,
            has_header: false,
            quote: None,
        }
    }
}

impl DelimitedConfig {
    /// Header-less pipe-delimited loan file
    pub fn loan_file() -> Self {
        Self::default()
    }

    /// Pipe-delimited transmittal sheet with a header row
    pub fn panel_file() -> Self {
        Self {
            has_header: true,
            ..Self::default()
        }
    }

    /// Convert delimiter byte to string representation
    pub(crate) fn delimiter_as_string(&self) -> String {
        if self.delimiter == b'\t' {
            "\\t".to_string()
        } else {
            String::from_utf8(vec![self.delimiter])
                .unwrap_or_else(|_| format!("\\x{:02x}", self.delimiter))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let loan = DelimitedConfig::loan_file();
        assert_eq!(loan.delimiter, b'|');
        assert!(!loan.has_header);
        assert!(loan.quote.is_none());

        let panel = DelimitedConfig::panel_file();
        assert_eq!(panel.delimiter, b'|');
        assert!(panel.has_header);
    }

    #[test]
    fn test_delimiter_as_string() {
        assert_eq!(DelimitedConfig::default().delimiter_as_string(), "|");
        let tabbed = DelimitedConfig {
            delimiter: b'\t',
            ..DelimitedConfig::default()
        };
        assert_eq!(tabbed.delimiter_as_string(), "\\t");
    }
}
