use crate::entry::ArchiveEntry;
use crate::error::Error;
use crate::name_map::NameMap;
use log::{debug, error, info, warn};
use path_jail::Jail;
use std::fmt;
use std::fs;
use std::io::{self, Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use zip::result::ZipError;
use zip::ZipArchive;

type PasswordPrompt = Arc<dyn Fn() -> io::Result<String> + Send + Sync>;

/// Settings for one extraction.
///
/// Every setter returns an updated copy, so a base configuration can be
/// reused for retries without sharing a mutable password field:
///
/// ```no_run
/// use zip_unicode::{ExtractOptions, ZipHandler};
///
/// let mut zip = ZipHandler::open("archive.zip")?.analyze(None)?;
/// let base = ExtractOptions::new().with_destination("/tmp/out");
/// if zip.extract_all(&base.clone().with_password("guess")).is_err() {
///     zip.extract_all(&base.with_password("password"))?;
/// }
/// # Ok::<(), zip_unicode::Error>(())
/// ```
#[derive(Clone)]
pub struct ExtractOptions {
    destination: Option<PathBuf>,
    password: Option<Vec<u8>>,
    prompt: PasswordPrompt,
}

impl ExtractOptions {
    /// Default destination, no password, masked terminal prompt.
    pub fn new() -> Self {
        Self {
            destination: None,
            password: None,
            prompt: Arc::new(|| rpassword::prompt_password("Password: ")),
        }
    }

    /// Extract here instead of the archive's default destination.
    pub fn with_destination<P: AsRef<Path>>(mut self, destination: P) -> Self {
        self.destination = Some(destination.as_ref().to_path_buf());
        self
    }

    /// Password for encrypted entries. An empty password counts as none.
    pub fn with_password<S: AsRef<[u8]>>(mut self, password: S) -> Self {
        let password = password.as_ref();
        self.password = (!password.is_empty()).then(|| password.to_vec());
        self
    }

    /// Replace the interactive prompt used when the archive is encrypted and
    /// no password was given.
    pub fn with_prompt<F>(mut self, prompt: F) -> Self
    where
        F: Fn() -> io::Result<String> + Send + Sync + 'static,
    {
        self.prompt = Arc::new(prompt);
        self
    }

    pub fn destination(&self) -> Option<&Path> {
        self.destination.as_deref()
    }

    pub fn password(&self) -> Option<&[u8]> {
        self.password.as_deref()
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ExtractOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractOptions")
            .field("destination", &self.destination)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    pub files_extracted: usize,
    pub bytes_written: u64,
    /// Directory markers and outputs that already exist as directories.
    pub entries_skipped: usize,
    /// Plain files removed because a directory had to take their place.
    pub parents_replaced: usize,
}

/// Extract every entry of `archive` under its corrected name.
///
/// Fail-fast: the first entry that cannot be written stops the loop and its
/// error is returned. Files written before that stay in place; running again
/// with the same destination overwrites them and skips existing directories.
pub(crate) fn extract_all<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    entries: &[ArchiveEntry],
    name_map: &NameMap,
    destination: &Path,
    options: &ExtractOptions,
) -> Result<ExtractionReport, Error> {
    fs::create_dir_all(destination)?;
    let jail = Jail::new(destination)?;

    let password = match options.password() {
        Some(password) => Some(password.to_vec()),
        None if entries.iter().any(|e| e.encrypted) => {
            let password = (options.prompt)().map_err(Error::PasswordUnavailable)?;
            Some(password.into_bytes())
        }
        None => None,
    };

    let mut report = ExtractionReport::default();

    for (internal_name, corrected_name) in name_map.iter() {
        if corrected_name.ends_with('/') {
            report.entries_skipped += 1;
            continue;
        }

        debug!("Extracting: {}", corrected_name);
        let result = extract_entry(
            archive,
            entries,
            &jail,
            destination,
            internal_name,
            corrected_name,
            password.as_deref(),
            &mut report,
        );

        if let Err(e) = result {
            match &e {
                Error::WrongPassword { .. } => error!("Wrong password!"),
                other => error!("{}: {}", corrected_name, other),
            }
            return Err(e);
        }
    }

    info!("Finished");
    Ok(report)
}

#[allow(clippy::too_many_arguments)]
fn extract_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    entries: &[ArchiveEntry],
    jail: &Jail,
    destination: &Path,
    internal_name: &str,
    corrected_name: &str,
    password: Option<&[u8]>,
    report: &mut ExtractionReport,
) -> Result<(), Error> {
    // The jail only validates; the returned path may have symlinks resolved.
    jail.join(corrected_name).map_err(|e| Error::PathEscape {
        entry: corrected_name.to_string(),
        detail: e.to_string(),
    })?;
    let out_path = destination.join(corrected_name);

    if out_path.is_dir() {
        // Already extracted, or a folder that the producer stored as a file.
        report.entries_skipped += 1;
        return Ok(());
    }

    if let Some(parent) = out_path.parent() {
        report.parents_replaced += remove_file_ancestors(destination, parent)?;
        fs::create_dir_all(parent)?;
    }

    let index = archive
        .index_for_name(internal_name)
        .ok_or(Error::Zip(ZipError::FileNotFound))?;
    let encrypted = entries.get(index).is_some_and(|e| e.encrypted);

    let mut file = match password {
        Some(password) if encrypted => {
            archive
                .by_index_decrypt(index, password)
                .map_err(|e| match e {
                    ZipError::InvalidPassword => Error::WrongPassword {
                        entry: corrected_name.to_string(),
                    },
                    e => Error::Zip(e),
                })?
        }
        _ => archive.by_index(index)?,
    };

    // A previous run may have left a read-only file here.
    if out_path.is_file() {
        fs::remove_file(&out_path)?;
    }

    let mut outfile = fs::File::create(&out_path)?;
    let written = io::copy(&mut file, &mut outfile)?;

    // Handle permissions on Unix
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Some(mode) = file.unix_mode() {
            // Strip setuid, setgid and sticky bits
            let safe_mode = mode & 0o0777;
            fs::set_permissions(&out_path, fs::Permissions::from_mode(safe_mode))?;
        }
    }

    report.files_extracted += 1;
    report.bytes_written += written;
    Ok(())
}

/// Delete plain files occupying directory slots between `destination` and
/// `parent`. Returns how many were removed.
fn remove_file_ancestors(destination: &Path, parent: &Path) -> io::Result<usize> {
    let mut removed = 0;
    for ancestor in parent.ancestors() {
        if ancestor == destination || !ancestor.starts_with(destination) {
            break;
        }
        if ancestor.is_file() {
            warn!("Replacing file '{}' with a directory", ancestor.display());
            fs::remove_file(ancestor)?;
            removed += 1;
        }
    }
    Ok(removed)
}
