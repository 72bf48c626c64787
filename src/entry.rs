//! Archive entries as seen by the name fixer.

use std::io::{Read, Seek};

use zip::ZipArchive;

use crate::error::Error;
use crate::header::read_local_flags;

/// Read-only view of one element inside a ZIP archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Position in the archive's central directory.
    pub index: usize,
    /// Name as decoded by the `zip` crate: UTF-8 when flagged, CP437 otherwise.
    pub internal_name: String,
    /// Name bytes exactly as stored in the header.
    pub raw_name: Vec<u8>,
    /// General purpose bit 0x800 is set.
    pub utf8_flagged: bool,
    /// General purpose bit 0x1 is set.
    pub encrypted: bool,
    /// Unix permission bits, if the producer recorded them.
    pub unix_mode: Option<u32>,
}

impl ArchiveEntry {
    /// The entry only marks a directory.
    pub fn is_directory_marker(&self) -> bool {
        self.internal_name.ends_with('/')
    }

    /// Name bytes of the entry and whether they are UTF-8.
    ///
    /// For flagged entries these are the UTF-8 bytes of the internal name.
    /// Otherwise they are the header bytes, i.e. the CP437 rendering
    /// encoded back to CP437.
    pub fn byte_name(&self) -> (bool, &[u8]) {
        if self.utf8_flagged {
            (true, self.internal_name.as_bytes())
        } else {
            (false, &self.raw_name)
        }
    }
}

/// Enumerate the entries of `archive`.
///
/// `headers` must read the same bytes as the archive; it is used to look at
/// each local file header for the general purpose flags.
pub(crate) fn read_entries<R, H>(
    archive: &mut ZipArchive<R>,
    headers: &mut H,
) -> Result<Vec<ArchiveEntry>, Error>
where
    R: Read + Seek,
    H: Read + Seek,
{
    let mut entries = Vec::with_capacity(archive.len());

    for index in 0..archive.len() {
        // by_index_raw reads metadata WITHOUT decompressing or decrypting
        let file = archive.by_index_raw(index)?;
        let internal_name = file.name().to_string();
        let raw_name = file.name_raw().to_vec();
        let offset = file.header_start();
        let unix_mode = file.unix_mode();
        drop(file);

        let flags = read_local_flags(headers, offset)?.ok_or_else(|| Error::InvalidHeader {
            entry: internal_name.clone(),
            offset,
        })?;

        entries.push(ArchiveEntry {
            index,
            internal_name,
            raw_name,
            utf8_flagged: flags.is_utf8(),
            encrypted: flags.is_encrypted(),
            unix_mode,
        });
    }

    Ok(entries)
}
