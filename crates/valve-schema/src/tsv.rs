//! Delimited text files
//!
//! Control tables, data files, and exports all share one dialect: a header
//! row, a single-byte delimiter, `"` quoting, and `\n` line endings.

use std::fs::File;
use std::path::Path;

/// Open a delimited file for reading
///
/// Records may be shorter or longer than the header.
pub fn reader(path: &Path, delimiter: u8) -> Result<csv::Reader<File>, csv::Error> {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_path(path)
}

/// Open a delimited file for writing, truncating it
pub fn writer(path: &Path, delimiter: u8) -> Result<csv::Writer<File>, csv::Error> {
    csv::WriterBuilder::new()
        .delimiter(delimiter)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_path(path)
}

/// Read the header row of a delimited file
///
/// Returns `None` when the file is completely empty.
pub fn read_header(path: &Path, delimiter: u8) -> Result<Option<Vec<String>>, csv::Error> {
    let mut rdr = reader(path, delimiter)?;
    let headers = rdr.headers()?;
    if headers.is_empty() {
        return Ok(None);
    }
    Ok(Some(headers.iter().map(str::to_string).collect()))
}
