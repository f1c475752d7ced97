//! Atomic I/O operations with file locking

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};

use fs2::FileExt;
use sha2::{Digest, Sha256};

use crate::{Error, NormalizedPath, Result};

/// Mode given to key files that did not exist before.
#[cfg(unix)]
const NEW_FILE_MODE: u32 = 0o600;

/// Mode given to directories created on the way to a key file.
#[cfg(unix)]
const NEW_DIR_MODE: u32 = 0o700;

/// Prefix for all checksums produced by this module
const CHECKSUM_PREFIX: &str = "sha256:";

/// Compute the SHA-256 checksum of text content as `sha256:<hex>`.
pub fn content_checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{}{:x}", CHECKSUM_PREFIX, hasher.finalize())
}

/// Read text content from a file under a shared advisory lock.
///
/// Readers never see a half-written file because [`write_atomic`] replaces
/// it with a rename. The lock only contends with other holders of a lock on
/// this same inode; it does not order reads against `write_atomic`.
pub fn read_text(path: &NormalizedPath) -> Result<String> {
    let native_path = path.to_native();
    let file = File::open(&native_path).map_err(|e| Error::io(&native_path, e))?;
    file.lock_shared().map_err(|_| Error::LockFailed {
        path: native_path.clone(),
    })?;

    let mut content = String::new();
    (&file)
        .read_to_string(&mut content)
        .map_err(|e| Error::io(&native_path, e))?;

    // Lock released when file is dropped
    Ok(content)
}

/// Read text content, returning `None` when the file does not exist.
pub fn read_optional(path: &NormalizedPath) -> Result<Option<String>> {
    match read_text(path) {
        Ok(content) => Ok(Some(content)),
        Err(Error::Io { source, .. }) if source.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Write content atomically to a file with locking.
///
/// Uses write-to-temp-then-rename so readers see either the old or the new
/// content. The permissions of an existing target are carried over to the
/// replacement; new files are created owner-only.
pub fn write_atomic(path: &NormalizedPath, content: &[u8]) -> Result<()> {
    let native_path = path.to_native();

    if let Some(parent) = path.parent() {
        create_dir_private(&parent)?;
    }

    let existing_permissions = match fs::metadata(&native_path) {
        Ok(meta) => Some(meta.permissions()),
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => return Err(Error::io(&native_path, e)),
    };

    // Temp file in the same directory keeps the rename on one filesystem
    let temp_name = format!(
        ".{}.{}.tmp",
        path.file_name().unwrap_or("keys"),
        std::process::id()
    );
    let temp_path = native_path.with_file_name(&temp_name);

    let result = write_temp(&temp_path, content, existing_permissions)
        .and_then(|()| fs::rename(&temp_path, &native_path).map_err(|e| Error::io(&native_path, e)));

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn write_temp(
    temp_path: &std::path::Path,
    content: &[u8],
    permissions: Option<fs::Permissions>,
) -> Result<()> {
    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(temp_path)
        .map_err(|e| Error::io(temp_path, e))?;

    temp_file.lock_exclusive().map_err(|_| Error::LockFailed {
        path: temp_path.to_path_buf(),
    })?;

    match permissions {
        Some(permissions) => fs::set_permissions(temp_path, permissions),
        None => set_new_file_mode(temp_path),
    }
    .map_err(|e| Error::io(temp_path, e))?;

    temp_file
        .write_all(content)
        .map_err(|e| Error::io(temp_path, e))?;
    temp_file.sync_all().map_err(|e| Error::io(temp_path, e))?;

    temp_file.unlock().map_err(|_| Error::LockFailed {
        path: temp_path.to_path_buf(),
    })
}

fn create_dir_private(dir: &NormalizedPath) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    let native = dir.to_native();
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(NEW_DIR_MODE);
    }
    builder.create(&native).map_err(|e| Error::io(&native, e))
}

#[cfg(unix)]
fn set_new_file_mode(path: &std::path::Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(NEW_FILE_MODE))
}

#[cfg(not(unix))]
fn set_new_file_mode(_path: &std::path::Path) -> std::io::Result<()> {
    Ok(())
}
