//! All-or-nothing file replacement.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

/// Writes `contents` to `path` through a temporary file in the same directory.
///
/// Readers observe either the previous file or the complete new one, never a
/// partial write. Missing parent directories are created.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the write/rename fails.
pub fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    staged(path, contents)?.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Like [`write_atomic`], but never replaces an existing file.
///
/// # Errors
///
/// Fails with [`std::io::ErrorKind::AlreadyExists`] if `path` exists, leaving it untouched.
pub fn write_new(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    staged(path, contents)?
        .persist_noclobber(path)
        .map_err(|e| e.error)?;
    Ok(())
}

fn staged(path: &Path, contents: &[u8]) -> std::io::Result<NamedTempFile> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    Ok(file)
}
