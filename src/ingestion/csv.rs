//! CSV row source.
//!
//! Rules:
//!
//! - The first line holds the headers; each header becomes a [`FlatRow`] key as-is.
//! - Records are read lazily, one per `next()`.
//! - Short records yield only the columns present; cells past the last header are ignored.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;

use crate::error::{IngestionError, IngestionResult};
use crate::types::FlatRow;

/// Open a CSV file as a lazy [`FlatRow`] source.
///
/// Fails with [`IngestionError::SourceNotFound`] when the file does not exist, and with an I/O
/// or CSV error when it cannot be opened or its header line cannot be read.
pub fn open_csv_source(path: impl AsRef<Path>) -> IngestionResult<CsvRowSource<File>> {
    let path = path.as_ref();
    let meta = fs::metadata(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => IngestionError::SourceNotFound {
            path: path.to_path_buf(),
        },
        _ => IngestionError::Io(e),
    })?;
    if meta.is_dir() {
        return Err(IngestionError::Io(io::Error::new(
            io::ErrorKind::IsADirectory,
            format!("{} is a directory", path.display()),
        )));
    }

    let rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    CsvRowSource::from_reader(rdr)
}

/// Iterator of [`FlatRow`]s over a CSV reader.
pub struct CsvRowSource<R> {
    headers: Vec<String>,
    records: csv::StringRecordsIntoIter<R>,
}

impl<R: Read> CsvRowSource<R> {
    /// Build a source from an existing reader (which must be configured with headers).
    pub fn from_reader(mut rdr: csv::Reader<R>) -> IngestionResult<Self> {
        let headers = rdr.headers()?.iter().map(str::to_owned).collect();
        Ok(Self {
            headers,
            records: rdr.into_records(),
        })
    }

    /// Header names in file order.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }
}

impl<R: Read> Iterator for CsvRowSource<R> {
    type Item = IngestionResult<FlatRow>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.records.next()? {
            Ok(record) => record,
            Err(e) => return Some(Err(e.into())),
        };
        Some(Ok(self
            .headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.as_str(), v))
            .collect()))
    }
}
