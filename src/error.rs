use std::fmt;

/// Errors that can occur while analysing, extracting or rebuilding an archive.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in minor versions without breaking existing code. Always include a
/// catch-all `_ =>` arm when matching.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// Corrected name escapes the destination directory.
    PathEscape { entry: String, detail: String },

    /// The user-supplied encoding label is not known.
    UnknownEncoding { label: String },

    /// Decrypting an entry failed because the password is wrong.
    WrongPassword { entry: String },

    /// The archive needs a password and none could be read interactively.
    PasswordUnavailable(std::io::Error),

    /// The local file header of an entry is missing or truncated.
    InvalidHeader { entry: String, offset: u64 },

    /// Zip format error.
    Zip(zip::result::ZipError),

    /// IO error.
    Io(std::io::Error),

    /// Path jail error.
    Jail(path_jail::JailError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PathEscape { entry, detail } => {
                write!(f, "path '{}' escapes destination: {}", entry, detail)
            }
            Self::UnknownEncoding { label } => {
                write!(f, "unknown encoding '{}'", label)
            }
            Self::WrongPassword { entry } => {
                write!(f, "wrong password for entry '{}'", entry)
            }
            Self::PasswordUnavailable(e) => {
                write!(f, "archive is encrypted and no password could be read: {}", e)
            }
            Self::InvalidHeader { entry, offset } => {
                write!(
                    f,
                    "entry '{}' has no valid local file header at offset {}",
                    entry, offset
                )
            }
            Self::Zip(e) => write!(f, "zip format error: {}", e),
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::Jail(e) => write!(f, "path validation error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::PasswordUnavailable(e) => Some(e),
            Self::Zip(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::Jail(e) => Some(e),
            _ => None,
        }
    }
}

// Automatic conversions for ease of use
impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self {
        Self::Zip(e)
    }
}
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
impl From<path_jail::JailError> for Error {
    fn from(e: path_jail::JailError) -> Self {
        Self::Jail(e)
    }
}
impl From<walkdir::Error> for Error {
    fn from(e: walkdir::Error) -> Self {
        Self::Io(e.into())
    }
}
