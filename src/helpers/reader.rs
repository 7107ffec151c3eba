use crate::error::EnrichError;
use encoding_rs::Encoding;
use glob::MatchOptions;
use glob::Pattern;
use std::fs::File;
use std::io::Cursor;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;
use url::Url;

/// Resolves an input location (plain path or `file://` URL) to an existing file.
///
/// # Arguments
/// * `location` - Path or file URL supplied by the caller
///
/// # Returns
/// * `Result<PathBuf, EnrichError>` - The local path, or `InputNotFound`
pub(crate) fn resolve_location(location: &str) -> Result<PathBuf, EnrichError> {
    let path = match Url::parse(location) {
        Ok(url) if url.scheme() == "file" => url
            .to_file_path()
            .map_err(|_| EnrichError::InputNotFound(location.to_owned()))?,
        _ => PathBuf::from(location),
    };
    if path.is_file() {
        Ok(path)
    } else {
        Err(EnrichError::InputNotFound(location.to_owned()))
    }
}

/// Returns true if the file name looks like an Excel 2007+ workbook.
pub fn is_spreadsheet_file(name: &str) -> bool {
    let options = MatchOptions {
        case_sensitive: false,
        ..MatchOptions::new()
    };
    Pattern::new("*.xlsx")
        .map(|pattern| pattern.matches_with(name, options))
        .unwrap_or(false)
}

/// Reads the whole file into memory, dropping a leading byte order mark.
/// The file handle is closed before this function returns, on every path.
pub(crate) fn open_without_bom<P: AsRef<Path>>(path: P) -> Result<Cursor<Vec<u8>>, EnrichError> {
    let mut bytes = Vec::new();
    File::open(path)?.read_to_end(&mut bytes)?;
    Ok(Cursor::new(strip_bom(bytes)))
}

fn strip_bom(mut bytes: Vec<u8>) -> Vec<u8> {
    if let Some((_, length)) = Encoding::for_bom(&bytes) {
        bytes.drain(..length);
    }
    bytes
}
