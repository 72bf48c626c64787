//! Character encodings of entry names.
//!
//! Entries without the UTF-8 flag were written in whatever code page the
//! producing machine used. Officially that is CP437, in practice it is the
//! local ANSI/OEM code page (Shift_JIS, GBK, EUC-KR, ...), so we make an
//! educated guess over all legacy names at once with chardetng.

use std::fmt;

use encoding_rs::Encoding;
use log::info;
use oem_cp::code_table::DECODING_TABLE_CP437;

use crate::entry::ArchiveEntry;
use crate::error::Error;

/// Decoder applied to legacy entry names.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NameEncoding {
    /// Any encoding known to the WHATWG Encoding Standard.
    Standard(&'static Encoding),

    /// [Codepage 437](https://en.wikipedia.org/wiki/Code_page_437), the
    /// default of the zip format. Decoding with it reproduces the
    /// internal name.
    Cp437,
}

/// Python/Windows code page names that are not WHATWG labels.
const CODE_PAGE_ALIASES: &[(&str, &str)] = &[
    ("cp932", "shift_jis"),
    ("932", "shift_jis"),
    ("shiftjis", "shift_jis"),
    ("cp936", "gbk"),
    ("936", "gbk"),
    ("cp950", "big5"),
    ("950", "big5"),
    ("cp949", "euc-kr"),
    ("949", "euc-kr"),
    ("uhc", "euc-kr"),
    ("cp20866", "koi8-r"),
    ("utf", "utf-8"),
];

impl NameEncoding {
    pub const UTF_8: Self = Self::Standard(encoding_rs::UTF_8);

    /// Resolve a user-supplied encoding label.
    ///
    /// Accepts WHATWG labels (`shift_jis`, `gbk`, `euc-kr`, `windows-1251`)
    /// as well as common code page names (`cp932`, `cp936`, `cp949`, `cp437`).
    pub fn for_label(label: &str) -> Result<Self, Error> {
        let normalized = label.trim().to_ascii_lowercase();

        if matches!(normalized.as_str(), "cp437" | "437" | "ibm437" | "cspc8codepage437") {
            return Ok(Self::Cp437);
        }

        let candidates = [
            normalized.clone(),
            normalized.replace('_', "-"),
            normalized.replace('-', "_"),
        ];
        for candidate in &candidates {
            if let Some(encoding) = Encoding::for_label_no_replacement(candidate.as_bytes()) {
                return Ok(Self::Standard(encoding));
            }
            if let Some((_, target)) = CODE_PAGE_ALIASES.iter().find(|(alias, _)| alias == candidate) {
                if let Some(encoding) = Encoding::for_label_no_replacement(target.as_bytes()) {
                    return Ok(Self::Standard(encoding));
                }
            }
        }

        Err(Error::UnknownEncoding {
            label: label.to_string(),
        })
    }

    /// Canonical name of the encoding.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Standard(encoding) => encoding.name(),
            Self::Cp437 => "IBM437",
        }
    }

    pub fn is_utf8(&self) -> bool {
        *self == Self::UTF_8
    }

    /// Decode `bytes`, replacing malformed sequences with U+FFFD.
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Self::Standard(encoding) => encoding.decode_without_bom_handling(bytes).0.into_owned(),
            Self::Cp437 => oem_cp::decode_string_complete_table(bytes, &DECODING_TABLE_CP437),
        }
    }
}

impl fmt::Display for NameEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of statistical detection over the legacy names of one archive.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct EncodingGuess {
    pub encoding: &'static Encoding,
    /// Language usually written in `encoding`, when it is specific to one.
    pub language: Option<&'static str>,
    /// Share of decoded characters that are not U+FFFD, in `0.0..=1.0`.
    pub confidence: f32,
}

impl EncodingGuess {
    pub fn name_encoding(&self) -> NameEncoding {
        NameEncoding::Standard(self.encoding)
    }
}

impl fmt::Display for EncodingGuess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | Language:{} | Confidence:{:.0}%",
            self.encoding.name(),
            self.language.unwrap_or(""),
            self.confidence * 100.0
        )
    }
}

/// Guess the single encoding shared by all non-UTF-8 names.
///
/// Returns `None` without running detection when every entry carries the
/// UTF-8 flag.
pub fn guess_encoding(entries: &[ArchiveEntry]) -> Option<EncodingGuess> {
    let legacy: Vec<&[u8]> = entries
        .iter()
        .map(ArchiveEntry::byte_name)
        .filter(|(utf8, _)| !utf8)
        .map(|(_, raw)| raw)
        .collect();

    if legacy.is_empty() {
        info!(" * All file names are properly in UTF8 encoding");
        return None;
    }

    // One buffer gives the detector more signal than any single name.
    let joined = legacy.join(&b' ');
    let guess = detect(&joined);
    info!(" * Detected encoding  :  {} ", guess);
    Some(guess)
}

/// Run charset detection over `bytes`.
pub fn detect(bytes: &[u8]) -> EncodingGuess {
    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);

    EncodingGuess {
        encoding,
        language: language_hint(encoding),
        confidence: confidence(encoding, bytes),
    }
}

fn confidence(encoding: &'static Encoding, bytes: &[u8]) -> f32 {
    let (decoded, _) = encoding.decode_without_bom_handling(bytes);
    let total = decoded.chars().count();
    if total == 0 {
        return 0.0;
    }
    let replaced = decoded.chars().filter(|&c| c == char::REPLACEMENT_CHARACTER).count();
    (total - replaced) as f32 / total as f32
}

fn language_hint(encoding: &'static Encoding) -> Option<&'static str> {
    let language = match encoding.name() {
        "Shift_JIS" | "EUC-JP" | "ISO-2022-JP" => "Japanese",
        "GBK" | "gb18030" | "Big5" => "Chinese",
        "EUC-KR" => "Korean",
        "windows-1251" | "KOI8-R" | "KOI8-U" | "IBM866" | "ISO-8859-5" => "Russian",
        "windows-1253" | "ISO-8859-7" => "Greek",
        "windows-1255" | "ISO-8859-8" | "ISO-8859-8-I" => "Hebrew",
        "windows-1256" | "ISO-8859-6" => "Arabic",
        "windows-874" => "Thai",
        "windows-1258" => "Vietnamese",
        "windows-1254" => "Turkish",
        "windows-1250" | "ISO-8859-2" => "Central European",
        "windows-1257" | "ISO-8859-4" | "ISO-8859-13" => "Baltic",
        _ => return None,
    };
    Some(language)
}
