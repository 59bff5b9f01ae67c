use crate::error::SchemaReadError;
use std::fs::File;
use std::io::BufReader;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum UnifiedReaderError {
    #[error("No data from remote workbook: '{0}'")]
    RemoteFileNoDataError(String),

    #[error("Invalid file URL: '{0}'")]
    FileUrlError(String),
}

/// Reader over a workbook that lives either on disk or behind a URL.
pub(crate) enum UnifiedReader {
    /// Local file reader
    Local(BufReader<File>),
    /// Remote workbook, fully buffered in memory
    Remote(Cursor<Vec<u8>>),
}

impl UnifiedReader {
    /// Opens a workbook from a local path, a `file://` URL or a remote URL.
    /// Remote URLs are fetched through DuckDB's `read_blob`, which takes care
    /// of protocols and credentials (http, https, s3, gs, hf, ...).
    pub(crate) fn new(file_name: &str) -> Result<UnifiedReader, SchemaReadError> {
        if Self::is_remote_url(file_name) {
            Self::read_blob_with_duckdb(file_name)
        } else {
            let file = File::open(Self::local_path(file_name)?)?;
            Ok(UnifiedReader::Local(BufReader::new(file)))
        }
    }

    /// Checks if a file name represents a remote URL
    pub(crate) fn is_remote_url(file_name: &str) -> bool {
        match Url::parse(file_name) {
            // single letter schemes are Windows drive letters
            Ok(url) => url.scheme() != "file" && url.scheme().len() > 1,
            Err(_) => false,
        }
    }

    /// Resolves `file://` URLs to paths, leaves plain paths untouched.
    fn local_path(file_name: &str) -> Result<PathBuf, SchemaReadError> {
        match Url::parse(file_name) {
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map_err(|_| UnifiedReaderError::FileUrlError(file_name.to_owned()).into()),
            _ => Ok(PathBuf::from(file_name)),
        }
    }

    fn read_blob_with_duckdb(file_name: &str) -> Result<UnifiedReader, SchemaReadError> {
        let connection = duckdb::Connection::open_in_memory()?;
        let result: Result<Vec<u8>, _> = connection.query_row("SELECT content FROM read_blob(?)", [file_name], |row| row.get(0));
        connection.close().map_err(|(_, e)| e)?;

        let bytes = result?;
        if bytes.is_empty() {
            Err(UnifiedReaderError::RemoteFileNoDataError(file_name.to_owned()))?;
        }
        Ok(UnifiedReader::Remote(Cursor::new(bytes)))
    }
}

impl Read for UnifiedReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            UnifiedReader::Local(reader) => reader.read(buf),
            UnifiedReader::Remote(reader) => reader.read(buf),
        }
    }
}

impl Seek for UnifiedReader {
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        match self {
            UnifiedReader::Local(reader) => reader.seek(pos),
            UnifiedReader::Remote(reader) => reader.seek(pos),
        }
    }
}
