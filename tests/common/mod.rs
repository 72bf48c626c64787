//! Fixture archives with legacy-encoded names.
//!
//! `zip::ZipWriter` only accepts `str` names and flags every non-ASCII one as
//! UTF-8. To store raw Shift_JIS bytes without the flag, each legacy name is
//! first written as an ASCII placeholder of the same length, then patched in
//! the finished archive (local header and central directory).

#![allow(dead_code)]

use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use encoding_rs::{Encoding, SHIFT_JIS};
use zip::unstable::write::FileOptionsExt;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub enum Name {
    /// Stored as is; flagged UTF-8 by the writer when non-ASCII.
    Utf8(String),
    /// Stored as these raw bytes without the UTF-8 flag.
    Legacy(Vec<u8>),
}

pub fn utf8(name: &str) -> Name {
    Name::Utf8(name.to_string())
}

pub fn legacy(name: &str, encoding: &'static Encoding) -> Name {
    let (bytes, _, had_errors) = encoding.encode(name);
    assert!(!had_errors, "'{}' is not representable in {}", name, encoding.name());
    Name::Legacy(bytes.into_owned())
}

pub fn sjis(name: &str) -> Name {
    legacy(name, SHIFT_JIS)
}

struct FixtureEntry {
    name: Name,
    content: Vec<u8>,
    is_dir: bool,
}

#[derive(Default)]
pub struct ZipBuilder {
    entries: Vec<FixtureEntry>,
    password: Option<Vec<u8>>,
}

impl ZipBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encrypt every file entry with ZipCrypto.
    pub fn password(mut self, password: &str) -> Self {
        self.password = Some(password.as_bytes().to_vec());
        self
    }

    pub fn file(mut self, name: Name, content: &[u8]) -> Self {
        self.entries.push(FixtureEntry {
            name,
            content: content.to_vec(),
            is_dir: false,
        });
        self
    }

    pub fn dir(mut self, name: Name) -> Self {
        self.entries.push(FixtureEntry {
            name,
            content: Vec::new(),
            is_dir: true,
        });
        self
    }

    pub fn write(self, path: &Path) -> PathBuf {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let mut patches = Vec::new();

        for (i, entry) in self.entries.iter().enumerate() {
            let name = match &entry.name {
                Name::Utf8(name) => name.clone(),
                Name::Legacy(raw) if raw.is_ascii() => String::from_utf8(raw.clone()).unwrap(),
                Name::Legacy(raw) => {
                    let placeholder = placeholder(i, raw);
                    patches.push((placeholder.clone().into_bytes(), raw.clone()));
                    placeholder
                }
            };

            let options =
                SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
            if entry.is_dir {
                zip.add_directory(name, options).unwrap();
            } else {
                let options = match &self.password {
                    Some(password) => options.with_deprecated_encryption(password),
                    None => options,
                };
                zip.start_file(name, options).unwrap();
                zip.write_all(&entry.content).unwrap();
            }
        }

        let mut bytes = zip.finish().unwrap().into_inner();
        for (placeholder, raw) in patches {
            let replaced = replace_all(&mut bytes, &placeholder, &raw);
            assert_eq!(replaced, 2, "placeholder must appear in both headers");
        }

        fs::write(path, bytes).unwrap();
        path.to_path_buf()
    }
}

/// ASCII stand-in with the same length (and trailing slash) as `raw`.
fn placeholder(index: usize, raw: &[u8]) -> String {
    let is_dir = raw.ends_with(b"/");
    let body_len = if is_dir { raw.len() - 1 } else { raw.len() };
    let mut placeholder = format!("@{}@", index);
    assert!(placeholder.len() <= body_len, "legacy name too short for a placeholder");
    while placeholder.len() < body_len {
        placeholder.push('~');
    }
    if is_dir {
        placeholder.push('/');
    }
    placeholder
}

fn replace_all(haystack: &mut [u8], needle: &[u8], replacement: &[u8]) -> usize {
    assert_eq!(needle.len(), replacement.len());
    let mut count = 0;
    let mut i = 0;
    while i + needle.len() <= haystack.len() {
        if &haystack[i..i + needle.len()] == needle {
            haystack[i..i + needle.len()].copy_from_slice(replacement);
            count += 1;
            i += needle.len();
        } else {
            i += 1;
        }
    }
    count
}

// ============================================================================
// Archives used across the test suite
// ============================================================================

pub const FLAT_NAMES: [&str; 3] = [
    "テストレポート＿リナックスノード.txt",
    "経営報告_桜ちゃん.txt",
    "太陽バッテリーver5.txt",
];

pub const MIXED_NAMES: [&str; 5] = [
    "Vùng Trời Bình Yên.txt",
    "бореиская.txt",
    "テストレポート＿リナックスノード.txt",
    "太陽バッテリーver5.txt",
    "経営報告_桜ちゃん.txt",
];

/// Content of the first flat entry, in Shift_JIS.
pub fn nothing_here() -> Vec<u8> {
    SHIFT_JIS.encode("何もない").0.into_owned()
}

/// Three Shift_JIS names, no folder.
pub fn flat_zip(dir: &Path) -> PathBuf {
    flat_builder().write(&dir.join("20200524_フラット.zip"))
}

/// Same as [`flat_zip`], encrypted with "password".
pub fn flat_pwd_zip(dir: &Path) -> PathBuf {
    flat_builder()
        .password("password")
        .write(&dir.join("20200524_フラットpwd.zip"))
}

fn flat_builder() -> ZipBuilder {
    ZipBuilder::new()
        .file(sjis(FLAT_NAMES[0]), &nothing_here())
        .file(sjis(FLAT_NAMES[1]), b"report")
        .file(sjis(FLAT_NAMES[2]), b"battery")
}

/// One UTF-8 flagged name and four Shift_JIS names.
pub fn mixed_zip(dir: &Path) -> PathBuf {
    ZipBuilder::new()
        .file(utf8(MIXED_NAMES[0]), b"utf8")
        .file(sjis(MIXED_NAMES[1]), b"cyrillic")
        .file(sjis(MIXED_NAMES[2]), &nothing_here())
        .file(sjis(MIXED_NAMES[3]), b"battery")
        .file(sjis(MIXED_NAMES[4]), b"report")
        .write(&dir.join("ミックス.zip"))
}

/// Everything nested under a folder named like the archive.
pub fn root_folder_zip(dir: &Path) -> PathBuf {
    ZipBuilder::new()
        .dir(sjis("20200524_ドラゴンフライト/"))
        .file(sjis("20200524_ドラゴンフライト/テストレポート.txt"), b"a")
        .file(sjis("20200524_ドラゴンフライト/経営報告.txt"), b"b")
        .write(&dir.join("20200524_ドラゴンフライト.zip"))
}

/// Nested under a folder whose name differs from the archive's.
pub fn other_root_folder_zip(dir: &Path) -> PathBuf {
    ZipBuilder::new()
        .dir(sjis("ドラゴンボール/"))
        .file(sjis("ドラゴンボール/テストレポート.txt"), b"a")
        .write(&dir.join("20200524_ドラゴンボール.zip"))
}

/// Sub-folders stored as zero-byte file entries before their contents.
pub fn nested_subfolder_zip(dir: &Path) -> PathBuf {
    ZipBuilder::new()
        .file(Name::Legacy(b"202301".to_vec()), b"")
        .file(Name::Legacy(b"202301/report.csv".to_vec()), b"1")
        .file(Name::Legacy(b"202302".to_vec()), b"")
        .file(Name::Legacy(b"202302/report.csv".to_vec()), b"2")
        .file(Name::Legacy(b"202303/report.csv".to_vec()), b"3")
        .file(Name::Legacy(b"202303".to_vec()), b"")
        .write(&dir.join("202301-03_hokkaido_jukyu.zip"))
}

/// Only UTF-8 flagged names.
pub fn utf8_zip(dir: &Path) -> PathBuf {
    ZipBuilder::new()
        .dir(utf8("フォルダ/"))
        .file(utf8("フォルダ/ファイル.txt"), b"content")
        .file(utf8("Vùng Trời Bình Yên.txt"), b"utf8")
        .write(&dir.join("utf8.zip"))
}

/// Names of the direct children of `dir`.
pub fn child_names(dir: &Path) -> std::collections::BTreeSet<String> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

pub fn set(names: &[&str]) -> std::collections::BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}
