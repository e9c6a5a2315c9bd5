//! Atomic configuration file writes.
//!
//! Files are staged as a hidden sibling, synced, given their final mode and
//! renamed over the target, so a daemon reloading mid-provision never sees
//! a truncated file.

use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use cap_std::fs::{Dir, OpenOptions};

use super::ProvisionError;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Write `contents` to `name` inside `dir` atomically.
///
/// `dir_path` is only used for error reporting. `mode` sets unix permission
/// bits on the new file before it becomes visible.
///
/// # Errors
///
/// Returns [`ProvisionError::Write`] when `name` is not a plain file name or
/// any filesystem step fails. The staged file is removed on failure.
pub(crate) fn write_atomic(
    dir: &Dir,
    dir_path: &Utf8Path,
    name: &str,
    contents: &str,
    mode: Option<u32>,
) -> Result<(), ProvisionError> {
    let target = dir_path.join(name);
    let mut components = Utf8Path::new(name).components();
    let (Some(Utf8Component::Normal(file_name)), None) = (components.next(), components.next())
    else {
        return Err(ProvisionError::write(target, "target must be a file name"));
    };

    let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_nanos());
    let tmp_name = format!(".{file_name}.tmp.{}.{stamp}.{counter}", std::process::id());
    let tmp_path = dir_path.join(&tmp_name);

    if let Err(err) = stage(dir, &tmp_name, contents, mode) {
        drop(dir.remove_file(&tmp_name));
        return Err(ProvisionError::write(tmp_path, err.to_string()));
    }
    if let Err(err) = dir.rename(&tmp_name, dir, file_name) {
        drop(dir.remove_file(&tmp_name));
        return Err(ProvisionError::write(target, err.to_string()));
    }

    // Best effort; the rename is already durable on most filesystems.
    drop(dir.open(".").and_then(|handle| handle.sync_all()));
    Ok(())
}

fn stage(dir: &Dir, tmp_name: &str, contents: &str, mode: Option<u32>) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    let mut file = dir.open_with(tmp_name, &options)?;
    file.write_all(contents.as_bytes())?;
    if let Some(mode) = mode {
        apply_mode(&file, mode)?;
    }
    file.sync_all()
}

#[cfg(unix)]
fn apply_mode(file: &cap_std::fs::File, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let permissions = std::fs::Permissions::from_mode(mode);
    file.set_permissions(cap_std::fs::Permissions::from_std(permissions))
}

#[cfg(not(unix))]
fn apply_mode(_file: &cap_std::fs::File, _mode: u32) -> io::Result<()> {
    Ok(())
}

/// Read `name` from `dir`, treating a missing file as empty.
pub(crate) fn read_or_empty(
    dir: &Dir,
    dir_path: &Utf8Path,
    name: &str,
) -> Result<String, ProvisionError> {
    match dir.read_to_string(name) {
        Ok(contents) => Ok(contents),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(String::new()),
        Err(err) => Err(ProvisionError::read(dir_path.join(name), err.to_string())),
    }
}

/// Create `path` if needed and open it as a capability handle.
pub(crate) fn open_dir(path: &Utf8Path) -> Result<Dir, ProvisionError> {
    let authority = cap_std::ambient_authority();
    Dir::create_ambient_dir_all(path, authority)
        .and_then(|()| Dir::open_ambient_dir(path, cap_std::ambient_authority()))
        .map_err(|err| ProvisionError::write(Utf8PathBuf::from(path), err.to_string()))
}
