use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

use crate::error::{LoadError, Result};
use crate::formats::reader::{DelimitedConfig, Record, SourceData, SourceReader};
use crate::io::ByteReader;

/// Generic delimited file reader that works with any ByteReader implementation
/// Fields come back exactly as written: no trimming, no type inference
pub struct GenericDelimitedReader<R: ByteReader> {
    reader: R,
    config: DelimitedConfig,
}

impl<R: ByteReader> GenericDelimitedReader<R> {
    pub fn new(reader: R, config: DelimitedConfig) -> Self {
        Self { reader, config }
    }

    fn parse(&self, buffer: &[u8]) -> Result<(Option<Vec<String>>, Vec<Record>)> {
        let mut builder = csv::ReaderBuilder::new();
        builder
            .delimiter(self.config.delimiter)
            .has_headers(false) // Header handled here so it keeps its line number
            .flexible(true) // Width is checked against the schema by the loader
            .quoting(self.config.quote.is_some());
        if let Some(quote) = self.config.quote {
            builder.quote(quote);
        }
        let mut csv_reader = builder.from_reader(buffer);

        let mut header = None;
        let mut records = Vec::new();

        for result in csv_reader.records() {
            let record = result.map_err(|e| {
                let at_line = e
                    .position()
                    .map(|p| format!("line {}: ", p.line()))
                    .unwrap_or_default();
                LoadError::source_file(
                    self.reader.location(),
                    format!("{}failed to parse delimited record: {}", at_line, e),
                )
            })?;

            let line_number = record.position().map_or(0, |p| p.line());
            let fields: Vec<String> = record.iter().map(|s| s.to_string()).collect();

            if self.config.has_header && header.is_none() {
                header = Some(fields);
                continue;
            }

            records.push(Record {
                line_number,
                fields,
            });
        }

        if self.config.has_header && header.is_none() {
            return Err(LoadError::source_file(
                self.reader.location(),
                "file is empty, expected a header row",
            ));
        }

        Ok((header, records))
    }
}

#[async_trait]
impl<R: ByteReader + 'static> SourceReader for GenericDelimitedReader<R> {
    fn location(&self) -> &Path {
        self.reader.location()
    }

    async fn read_all(&self) -> Result<SourceData> {
        let buffer = self.reader.read_all().await?;

        debug!(
            source = %self.reader.location().display(),
            bytes = buffer.len(),
            delimiter = %self.config.delimiter_as_string(),
            "Parsing delimited source"
        );

        let (header, records) = self.parse(&buffer)?;

        Ok(SourceData {
            header,
            records,
            bytes_read: buffer.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::LocalFileByteReader;
    use crate::io::byte_reader::tests::MockByteReader;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn reader(data: &str, config: DelimitedConfig) -> GenericDelimitedReader<MockByteReader> {
        GenericDelimitedReader::new(MockByteReader::new(data), config)
    }

    #[tokio::test]
    async fn test_preserves_leading_zeros_and_sentinels() {
        let data = "2024|549300ABC|06|037|Exempt|NA|\n";
        let parsed = reader(data, DelimitedConfig::loan_file())
            .read_all()
            .await
            .unwrap();

        assert!(parsed.header.is_none());
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(
            parsed.records[0].fields,
            vec!["2024", "549300ABC", "06", "037", "Exempt", "NA", ""]
        );
    }

    #[tokio::test]
    async fn test_header_split_from_records() {
        let data = "activity_year|lei\n2023|AAA\n2023|BBB\n";
        let parsed = reader(data, DelimitedConfig::panel_file())
            .read_all()
            .await
            .unwrap();

        assert_eq!(
            parsed.header,
            Some(vec!["activity_year".to_string(), "lei".to_string()])
        );
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[0].line_number, 2);
        assert_eq!(parsed.records[1].fields[1], "BBB");
    }

    #[tokio::test]
    async fn test_ragged_rows_are_returned_not_rejected() {
        let data = "a|b|c\nd|e\nf|g|h|i\n";
        let parsed = reader(data, DelimitedConfig::loan_file())
            .read_all()
            .await
            .unwrap();

        let widths: Vec<usize> = parsed.records.iter().map(|r| r.fields.len()).collect();
        assert_eq!(widths, vec![3, 2, 4]);
        assert_eq!(parsed.records[1].line_number, 2);
    }

    #[tokio::test]
    async fn test_quotes_are_literal_by_default() {
        let data = "\"First Bank\"|x\n";
        let parsed = reader(data, DelimitedConfig::loan_file())
            .read_all()
            .await
            .unwrap();
        assert_eq!(parsed.records[0].fields[0], "\"First Bank\"");

        let quoted = DelimitedConfig {
            quote: Some(b'"'),
            ..DelimitedConfig::loan_file()
        };
        let data = "\"Bank | Trust\"|x\n";
        let parsed = reader(data, quoted).read_all().await.unwrap();
        assert_eq!(parsed.records[0].fields, vec!["Bank | Trust", "x"]);
    }

    #[tokio::test]
    async fn test_crlf_line_endings() {
        let data = "a|b\r\nc|d\r\n";
        let parsed = reader(data, DelimitedConfig::loan_file())
            .read_all()
            .await
            .unwrap();
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[1].fields, vec!["c", "d"]);
    }

    #[tokio::test]
    async fn test_empty_panel_file_is_source_error() {
        let err = reader("", DelimitedConfig::panel_file())
            .read_all()
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::SourceFile { .. }));
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_source_error() {
        let mock = MockByteReader {
            label: "memory://bad".into(),
            data: vec![b'a', b'|', 0xff, 0xfe, b'\n'],
        };
        let err = GenericDelimitedReader::new(mock, DelimitedConfig::loan_file())
            .read_all()
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::SourceFile { .. }));
    }

    #[tokio::test]
    async fn test_local_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "2024|LEI1|1").unwrap();
        writeln!(temp_file, "2024|LEI2|2").unwrap();
        temp_file.flush().unwrap();

        let byte_reader = LocalFileByteReader::new(temp_file.path());
        let parsed = GenericDelimitedReader::new(byte_reader, DelimitedConfig::loan_file())
            .read_all()
            .await
            .unwrap();

        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[0].fields, vec!["2024", "LEI1", "1"]);
        assert!(parsed.bytes_read > 0);
    }
}
