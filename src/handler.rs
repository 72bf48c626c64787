//! The archive handle and its two-phase lifecycle.
//!
//! [`ZipHandler::open`] only reads metadata. [`ZipHandler::analyze`] runs
//! encoding detection and builds the name map, so failures while reading the
//! archive are told apart from failures while interpreting it.

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use log::{info, warn};
use zip::ZipArchive;

use crate::encoding::{guess_encoding, EncodingGuess, NameEncoding};
use crate::entry::{read_entries, ArchiveEntry};
use crate::error::Error;
use crate::extractor::{self, ExtractOptions, ExtractionReport};
use crate::name_map::{build_name_map, has_duplicated_root_name, NameMap};
use crate::rebuild::{fixed_archive_path, zip_dir};

/// An opened zip archive whose entry names have not been interpreted yet.
pub struct ZipHandler {
    path: PathBuf,
    archive: ZipArchive<BufReader<File>>,
    entries: Vec<ArchiveEntry>,
}

impl ZipHandler {
    /// Open the archive at `path` and read its entry metadata.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = std::path::absolute(path.as_ref())?;
        let mut archive = ZipArchive::new(BufReader::new(File::open(&path)?))?;
        let mut headers = BufReader::new(File::open(&path)?);
        let entries = read_entries(&mut archive, &mut headers)?;

        Ok(Self {
            path,
            archive,
            entries,
        })
    }

    /// Absolute path of the archive.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// At least one entry is password protected.
    pub fn is_encrypted(&self) -> bool {
        self.entries.iter().any(|e| e.encrypted)
    }

    /// No entry lacks the UTF-8 flag.
    pub fn all_utf8(&self) -> bool {
        self.entries.iter().all(|e| e.utf8_flagged)
    }

    /// Decide how legacy names are decoded and build the name map.
    ///
    /// An explicit `encoding` label always wins over detection. Without one,
    /// detection runs only if some entry lacks the UTF-8 flag.
    pub fn analyze(self, encoding: Option<&str>) -> Result<AnalyzedZip, Error> {
        let all_utf8 = self.all_utf8();

        let (encoding, guess) = match encoding {
            Some(label) => {
                let encoding = NameEncoding::for_label(label)?;
                info!(" * Using encoding     :  {}", encoding);
                (encoding, None)
            }
            None => match guess_encoding(&self.entries) {
                Some(guess) => (guess.name_encoding(), Some(guess)),
                None => (NameEncoding::UTF_8, None),
            },
        };

        let name_map = build_name_map(&self.entries, encoding);
        let self_rooted = has_duplicated_root_name(&name_map, &self.path);

        let parent = self
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let default_destination = if self_rooted {
            parent
        } else {
            let stem = self.path.file_stem().unwrap_or_default();
            parent.join(stem)
        };

        Ok(AnalyzedZip {
            handler: self,
            encoding,
            guess,
            all_utf8,
            name_map,
            self_rooted,
            default_destination,
        })
    }
}

/// An archive with a decided name encoding and a complete name map.
pub struct AnalyzedZip {
    handler: ZipHandler,
    encoding: NameEncoding,
    guess: Option<EncodingGuess>,
    all_utf8: bool,
    name_map: NameMap,
    self_rooted: bool,
    default_destination: PathBuf,
}

impl AnalyzedZip {
    pub fn handler(&self) -> &ZipHandler {
        &self.handler
    }

    pub fn path(&self) -> &Path {
        self.handler.path()
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        self.handler.entries()
    }

    pub fn is_encrypted(&self) -> bool {
        self.handler.is_encrypted()
    }

    /// Encoding applied to names without the UTF-8 flag.
    pub fn encoding(&self) -> NameEncoding {
        self.encoding
    }

    /// Detection result, if detection ran.
    pub fn guess(&self) -> Option<&EncodingGuess> {
        self.guess.as_ref()
    }

    pub fn all_utf8(&self) -> bool {
        self.all_utf8
    }

    pub fn name_map(&self) -> &NameMap {
        &self.name_map
    }

    /// All entries sit under a folder named like the archive.
    pub fn has_duplicated_root_name(&self) -> bool {
        self.self_rooted
    }

    /// The archive's directory when self-rooted, `<dir>/<stem>` otherwise.
    pub fn default_destination(&self) -> &Path {
        &self.default_destination
    }

    /// Extract all entries under their corrected names.
    ///
    /// Prompts for a password through `options` when the archive is
    /// encrypted and none was given. Stops at the first failing entry.
    pub fn extract_all(&mut self, options: &ExtractOptions) -> Result<ExtractionReport, Error> {
        let destination = options
            .destination()
            .unwrap_or(self.default_destination.as_path())
            .to_path_buf();

        extractor::extract_all(
            &mut self.handler.archive,
            &self.handler.entries,
            &self.name_map,
            &destination,
            options,
        )
    }

    /// Write `<stem>_fixed.zip` next to the archive, with UTF-8 names.
    ///
    /// The destination in `options` is ignored; entries go through a
    /// temporary directory that is removed afterwards. The new archive is
    /// never encrypted.
    pub fn fix_it(&mut self, options: &ExtractOptions) -> Result<PathBuf, Error> {
        let target = fixed_archive_path(self.path());

        {
            let tmp = tempfile::tempdir()?;
            self.extract_all(&options.clone().with_destination(tmp.path()))?;
            info!("Creating archive: {}", target.display());
            zip_dir(tmp.path(), &target)?;
        }

        if self.is_encrypted() {
            warn!(" !!! Fixed zipfile is NOT password protected!");
        }

        Ok(target)
    }

    /// Human-readable overview of the archive and its corrected names.
    pub fn summary(&self) -> Summary<'_> {
        Summary { zip: self }
    }
}

/// See [`AnalyzedZip::summary`].
pub struct Summary<'a> {
    zip: &'a AnalyzedZip,
}

const RULE_WIDTH: usize = 79;

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let zip = self.zip;
        writeln!(
            f,
            " * Default destination:  {}",
            zip.default_destination.display()
        )?;
        writeln!(f, " * Password protected :  {}", zip.is_encrypted())?;

        let title = if zip.all_utf8 {
            String::new()
        } else {
            format!(" try encoding: {} ", zip.encoding)
        };
        writeln!(f, "{:-^width$}", title, width = RULE_WIDTH)?;

        for entry in zip.entries() {
            if entry.utf8_flagged {
                writeln!(f, "(UTF-8) {}", entry.internal_name)?;
            } else {
                writeln!(f, "{}", zip.encoding.decode(&entry.raw_name))?;
            }
        }
        writeln!(f, "{}", "-".repeat(RULE_WIDTH.max(title.chars().count())))?;

        writeln!(
            f,
            "Add '-e ENCODING' to see filename shown in encoding ENCODING (shift_jis, gbk, euc-kr,...)"
        )?;
        write!(f, "Add '-x' flag to extract all files to default destination")
    }
}
