use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use time::macros::format_description;
use time::OffsetDateTime;

use super::layout_doc::LayoutDocument;

/// Load the saved tag map layout.
///
/// A missing, unreadable or malformed file is an empty document: the map then
/// falls back to auto-placing every tag.
pub fn load_layout(path: &Path) -> LayoutDocument {
    if !path.exists() {
        debug!("no saved layout at {}", path.display());
        return LayoutDocument::default();
    }
    match fs::read_to_string(path) {
        Ok(text) => match LayoutDocument::parse(&text) {
            Ok(doc) => doc,
            Err(e) => {
                warn!("layout file {} is malformed ({}); starting from an empty layout", path.display(), e);
                LayoutDocument::default()
            }
        },
        Err(e) => {
            warn!("could not read layout file {}: {}", path.display(), e);
            LayoutDocument::default()
        }
    }
}

fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let tmp_path = path.with_extension("json.tmp");
    {
        let mut f = File::create(&tmp_path)?;
        f.write_all(data)?;
        f.write_all(b"\n")?;
        f.flush()?;
    }
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }
    Ok(())
}

pub fn save_layout(path: &Path, doc: &LayoutDocument) -> anyhow::Result<PathBuf> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let s = doc.to_json_pretty()?;
    atomic_write(path, s.as_bytes())?;
    Ok(path.to_path_buf())
}

pub fn snapshot_path_now(dir: &Path) -> PathBuf {
    let now = OffsetDateTime::now_utc();
    let fmt = format_description!("[year][month][day]_[hour][minute][second]");
    let stamp = now.format(fmt).unwrap_or_else(|_| "unknown".to_string());
    dir.join(format!("tag_map_layout_{}.json", stamp))
}

/// Write a timestamped copy of `doc` into `dir`.
pub fn save_snapshot(dir: &Path, doc: &LayoutDocument) -> anyhow::Result<PathBuf> {
    save_layout(&snapshot_path_now(dir), doc)
}

pub fn list_snapshots(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut entries: Vec<PathBuf> = Vec::new();
    if dir.exists() {
        for e in fs::read_dir(dir)? {
            let p = e?.path();
            if let Some(name) = p.file_name().and_then(|s| s.to_str())
                && name.starts_with("tag_map_layout_") && name.ends_with(".json")
            {
                entries.push(p);
            }
        }
    }
    // newest first; names sort by timestamp
    entries.sort();
    entries.reverse();
    Ok(entries)
}
