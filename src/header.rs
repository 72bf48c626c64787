//! Local file header access.
//!
//! The `zip` crate decodes entry names for us but does not expose the
//! general purpose bit flags, so the two bits we care about are read
//! straight from each entry's local file header.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read, Seek, SeekFrom};

/// Local File Header (LFH) - 30 bytes
pub const LFH_SIGNATURE: &[u8] = b"PK\x03\x04";
pub const LFH_SIZE: usize = 30;

/// Entry content is encrypted.
pub const FLAG_ENCRYPTED: u16 = 1 << 0;
/// Entry name (and comment) are UTF-8 encoded.
pub const FLAG_UTF8: u16 = 1 << 11;

/// General purpose bit flags of one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GeneralFlags(u16);

impl GeneralFlags {
    pub fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> u16 {
        self.0
    }

    pub fn is_utf8(&self) -> bool {
        self.0 & FLAG_UTF8 != 0
    }

    pub fn is_encrypted(&self) -> bool {
        self.0 & FLAG_ENCRYPTED != 0
    }

    /// Parse the flags out of a raw local file header.
    ///
    /// Returns `None` if the buffer is too short or the signature is wrong.
    pub fn from_local_header(data: &[u8]) -> Option<Self> {
        if data.len() < LFH_SIZE || &data[0..4] != LFH_SIGNATURE {
            return None;
        }

        let mut cursor = Cursor::new(&data[4..]);
        let _version_needed = cursor.read_u16::<LittleEndian>().ok()?;
        let flags = cursor.read_u16::<LittleEndian>().ok()?;
        Some(Self(flags))
    }
}

/// Read the general purpose flags of the local header starting at `offset`.
///
/// `Ok(None)` means the bytes at `offset` are not a local file header.
pub fn read_local_flags<R: Read + Seek>(
    reader: &mut R,
    offset: u64,
) -> std::io::Result<Option<GeneralFlags>> {
    let mut buf = [0u8; LFH_SIZE];
    reader.seek(SeekFrom::Start(offset))?;
    match reader.read_exact(&mut buf) {
        Ok(()) => Ok(GeneralFlags::from_local_header(&buf)),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e),
    }
}
