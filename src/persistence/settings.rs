use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::graph_utils::scene::DEFAULT_DRAG_THRESHOLD;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    // If None, read notes.json from the OS data directory
    #[serde(default)]
    pub notes_override: Option<PathBuf>,
    // If None, keep the tag map layout next to the notes
    #[serde(default)]
    pub layout_override: Option<PathBuf>,
    // If None, snapshots go to a "snapshots" folder beside the layout
    #[serde(default)]
    pub snapshot_override: Option<PathBuf>,
    #[serde(default = "AppSettings::default_drag_threshold")]
    pub drag_threshold: f64,
    #[serde(default = "AppSettings::default_show_edge_labels")]
    pub show_edge_labels: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            notes_override: None,
            layout_override: None,
            snapshot_override: None,
            drag_threshold: Self::default_drag_threshold(),
            show_edge_labels: Self::default_show_edge_labels(),
        }
    }
}

impl AppSettings {
    fn config_dir() -> PathBuf {
        #[cfg(target_os = "macos")]
        {
            // ~/Library/Application Support/Tag-Map
            let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("~"));
            return home.join("Library").join("Application Support").join("Tag-Map");
        }
        #[cfg(target_os = "windows")]
        {
            // %APPDATA%\Tag-Map
            if let Ok(appdata) = std::env::var("APPDATA") {
                return PathBuf::from(appdata).join("Tag-Map");
            }
            return PathBuf::from("Tag-Map");
        }
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            // $XDG_CONFIG_HOME/tag-map or ~/.config/tag-map
            if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
                return PathBuf::from(xdg).join("tag-map");
            }
            let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("~"));
            return home.join(".config").join("tag-map");
        }
    }

    fn data_default_dir() -> PathBuf {
        #[cfg(target_os = "macos")]
        {
            return Self::config_dir();
        }
        #[cfg(target_os = "windows")]
        {
            // %LOCALAPPDATA%\Tag-Map else the roaming config dir
            if let Ok(local) = std::env::var("LOCALAPPDATA") {
                return PathBuf::from(local).join("Tag-Map");
            }
            return Self::config_dir();
        }
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            // $XDG_DATA_HOME/tag-map or ~/.local/share/tag-map
            if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
                return PathBuf::from(xdg).join("tag-map");
            }
            if let Ok(home) = std::env::var("HOME") {
                return PathBuf::from(home).join(".local").join("share").join("tag-map");
            }
            return std::env::temp_dir().join("tag-map");
        }
    }

    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_dir().join("settings.json"))
    }

    /// Read settings from `path`; a missing file gives the defaults.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let mut f = fs::File::open(path)?;
        let mut s = String::new();
        f.read_to_string(&mut s)?;
        let v: Self = serde_json::from_str(&s)?;
        Ok(v)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_dir().join("settings.json"))
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let s = serde_json::to_string_pretty(self)?;
        let mut f = fs::File::create(path)?;
        f.write_all(s.as_bytes())?;
        Ok(())
    }

    pub fn notes_path(&self) -> PathBuf {
        if let Some(p) = &self.notes_override { return p.clone(); }
        Self::data_default_dir().join("notes.json")
    }

    pub fn layout_path(&self) -> PathBuf {
        if let Some(p) = &self.layout_override { return p.clone(); }
        Self::data_default_dir().join("tag_map_layout.json")
    }

    pub fn snapshot_dir(&self) -> PathBuf {
        if let Some(p) = &self.snapshot_override { return p.clone(); }
        let layout = self.layout_path();
        layout.parent().map(Path::to_path_buf).unwrap_or_default().join("snapshots")
    }

    pub(crate) fn default_drag_threshold() -> f64 { DEFAULT_DRAG_THRESHOLD }
    pub(crate) fn default_show_edge_labels() -> bool { true }
}
