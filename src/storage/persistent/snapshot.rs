//! Whole-collection snapshot files, replaced atomically.
//!
//! A snapshot is the file header followed by a single codec record. Writes go
//! to a uniquely named temp file in the same directory, are flushed and
//! fsynced, then renamed over the target. A reader opening the target sees
//! either the previous snapshot or the new one, never a mix.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Result as IoResult, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use super::codec;

const TEMP_EXTENSION: &str = "tmp";

/// In-progress snapshot write. Dropping it without `commit` removes the temp file.
pub struct SnapshotWriter {
    temp_path: Option<PathBuf>,
    final_path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl SnapshotWriter {
    /// Starts a snapshot that will replace `final_path` on commit.
    pub fn create(final_path: &Path) -> IoResult<Self> {
        let file_name = final_path
            .file_name()
            .map_or_else(|| String::from("snapshot"), |n| n.to_string_lossy().into_owned());
        let temp_path =
            final_path.with_file_name(format!("{file_name}.{}.{TEMP_EXTENSION}", Uuid::new_v4()));

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)?;

        let mut writer = BufWriter::new(file);
        codec::write_header(&mut writer)?;

        Ok(Self {
            temp_path: Some(temp_path),
            final_path: final_path.to_path_buf(),
            writer: Some(writer),
        })
    }

    /// Writes the snapshot body, syncs it and renames it into place.
    ///
    /// The rename is the commit point: once this returns `Ok` the new snapshot
    /// is visible to every subsequent reader. Making the rename itself durable
    /// needs a separate [`sync_parent_dir`] call.
    pub fn commit<T: Serialize>(mut self, value: &T, sync: bool) -> IoResult<()> {
        let mut writer = self.writer.take().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "snapshot writer already consumed")
        })?;

        writer.write_all(&codec::encode(value)?)?;
        writer.flush()?;
        if sync {
            writer.get_ref().sync_all()?;
        }
        drop(writer);

        let temp_path = self.temp_path.take().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "snapshot temp path already consumed")
        })?;
        if let Err(e) = fs::rename(&temp_path, &self.final_path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }
        Ok(())
    }
}

impl Drop for SnapshotWriter {
    fn drop(&mut self) {
        self.writer.take();
        if let Some(ref temp_path) = self.temp_path {
            let _ = fs::remove_file(temp_path);
        }
    }
}

/// Atomically replaces `path` with a snapshot of `value`.
///
/// With `sync` set, the directory entry is synced too and a failure there is
/// returned even though the new snapshot is already in place.
pub fn write<T: Serialize>(path: &Path, value: &T, sync: bool) -> IoResult<()> {
    SnapshotWriter::create(path)?.commit(value, sync)?;
    if sync {
        sync_parent_dir(path)?;
    }
    Ok(())
}

/// Reads and verifies the snapshot at `path`.
pub fn read<T: DeserializeOwned>(path: &Path) -> IoResult<T> {
    let mut reader = BufReader::new(File::open(path)?);
    codec::read_header(&mut reader)?;
    codec::decode(&mut reader)
}

/// Deletes temp files left behind by writes interrupted by a crash.
pub fn remove_stale_temp_files(dir: &Path) -> IoResult<usize> {
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|e| e == TEMP_EXTENSION) && path.is_file() {
            fs::remove_file(&path)?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Fsyncs the directory containing `path` so a rename into it survives power loss.
#[cfg(unix)]
pub fn sync_parent_dir(path: &Path) -> IoResult<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => File::open(dir)?.sync_all(),
        _ => Ok(()),
    }
}

/// Directory entries need no separate sync on this platform.
#[cfg(not(unix))]
pub fn sync_parent_dir(_path: &Path) -> IoResult<()> {
    Ok(())
}
