//! Re-packing an extracted tree as a UTF-8 named archive.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;
use tempfile::NamedTempFile;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::error::Error;

/// `<parent>/<stem>_fixed.zip` for the archive at `archive_path`.
pub fn fixed_archive_path(archive_path: &Path) -> PathBuf {
    let stem = archive_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parent = archive_path.parent().unwrap_or_else(|| Path::new(""));
    parent.join(format!("{}_fixed.zip", stem))
}

/// Pack the contents of `src_dir` into a new zip at `dest_file`.
///
/// Entry names are relative to `src_dir` and always use `/`. Non-ASCII names
/// get the UTF-8 flag from the writer. An existing `dest_file` is replaced,
/// and is left untouched if packing fails.
/// Returns the number of entries written.
pub fn zip_dir(src_dir: &Path, dest_file: &Path) -> Result<usize, Error> {
    if !src_dir.is_dir() {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("'{}' is not a directory", src_dir.display()),
        )));
    }

    // Written beside the target and renamed in once complete.
    let dir = match dest_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut partial = NamedTempFile::new_in(dir)?;
    let mut zip = ZipWriter::new(partial.as_file_mut());
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    let mut written = 0;

    for entry in WalkDir::new(src_dir).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        let relative = path.strip_prefix(src_dir).map_err(io::Error::other)?;

        // Only if not root
        if relative.as_os_str().is_empty() {
            continue;
        }

        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if entry.file_type().is_dir() {
            debug!("adding dir {}", name);
            zip.add_directory(name, options)?;
        } else {
            debug!("adding file {}", name);
            zip.start_file(name, options)?;
            let mut f = File::open(path)?;
            io::copy(&mut f, &mut zip)?;
        }
        written += 1;
    }

    zip.finish()?;
    partial.persist(dest_file).map_err(|e| e.error)?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_path_sits_next_to_original() {
        assert_eq!(
            fixed_archive_path(Path::new("/data/ミックス.zip")),
            PathBuf::from("/data/ミックス_fixed.zip")
        );
        assert_eq!(
            fixed_archive_path(Path::new("flat.zip")),
            PathBuf::from("flat_fixed.zip")
        );
    }

    #[test]
    fn zip_dir_uses_forward_slashes() {
        let src = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(src.path().join("フォルダ").join("sub")).unwrap();
        std::fs::write(src.path().join("フォルダ").join("sub").join("a.txt"), b"a").unwrap();
        std::fs::write(src.path().join("b.txt"), b"b").unwrap();

        let out = tempfile::tempdir().unwrap();
        let dest = out.path().join("out.zip");
        assert_eq!(zip_dir(src.path(), &dest).unwrap(), 4);

        let archive = zip::ZipArchive::new(File::open(&dest).unwrap()).unwrap();
        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort_unstable();
        assert_eq!(
            names,
            vec!["b.txt", "フォルダ/", "フォルダ/sub/", "フォルダ/sub/a.txt"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn zip_dir_failure_leaves_no_archive() {
        let src = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("a.txt"), b"a").unwrap();
        std::os::unix::fs::symlink(src.path().join("gone"), src.path().join("b.txt")).unwrap();

        let out = tempfile::tempdir().unwrap();
        let dest = out.path().join("out.zip");
        assert!(zip_dir(src.path(), &dest).is_err());
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);

        // A previous archive survives a failed rebuild.
        std::fs::write(&dest, b"previous").unwrap();
        assert!(zip_dir(src.path(), &dest).is_err());
        assert_eq!(std::fs::read(&dest).unwrap(), b"previous");
    }

    #[test]
    fn zip_dir_requires_directory() {
        let out = tempfile::tempdir().unwrap();
        let missing = out.path().join("missing");
        assert!(zip_dir(&missing, &out.path().join("x.zip")).is_err());
    }
}
