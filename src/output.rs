use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use crate::error::{Result, SnapshotError};
use crate::snapshot::Snapshot;

// Writes next to the destination, then renames over it. A failure at any point
// leaves the previous snapshot as it was.
pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| io_error(parent, source))?;
    }

    let tmp_path = temp_path_for(path);
    let result = write_pretty(&tmp_path, snapshot)
        .and_then(|_| fs::rename(&tmp_path, path).map_err(|source| io_error(path, source)));

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

fn write_pretty(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let file = File::create(path).map_err(|source| io_error(path, source))?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, snapshot).map_err(|source| SnapshotError::Parse {
        what: "snapshot serialization",
        source,
    })?;

    writer
        .flush()
        .and_then(|_| writer.get_ref().sync_all())
        .map_err(|source| io_error(path, source))
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn io_error(path: &Path, source: std::io::Error) -> SnapshotError {
    SnapshotError::Io { path: path.to_path_buf(), source }
}
