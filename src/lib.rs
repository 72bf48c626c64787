pub mod encoding;
pub mod entry;
mod error;
mod extractor;
mod handler;
pub mod header;
pub mod name_map;
mod rebuild;

pub use encoding::{EncodingGuess, NameEncoding};
pub use entry::ArchiveEntry;
pub use error::Error;
pub use extractor::{ExtractOptions, ExtractionReport};
pub use handler::{AnalyzedZip, Summary, ZipHandler};
pub use name_map::NameMap;
pub use rebuild::{fixed_archive_path, zip_dir};

/// Convenience function to extract a zip file to its default destination,
/// guessing the name encoding.
pub fn extract_file<P: AsRef<std::path::Path>>(
    file_path: P,
    options: &ExtractOptions,
) -> Result<ExtractionReport, Error> {
    ZipHandler::open(file_path)?
        .analyze(None)?
        .extract_all(options)
}

/// Convenience function to write `<stem>_fixed.zip` with UTF-8 names next to
/// `file_path`. Returns the path of the new archive.
pub fn fix_file<P: AsRef<std::path::Path>>(
    file_path: P,
    options: &ExtractOptions,
) -> Result<std::path::PathBuf, Error> {
    ZipHandler::open(file_path)?.analyze(None)?.fix_it(options)
}
