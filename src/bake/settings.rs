// src/bake/settings.rs
//! Bake/export settings, loadable from a `.bake.ron` file.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BakeSettings {
    /// Stem of every exported file (sanitized before use).
    pub output_name: String,
    /// Filesystem folder the files are written to; created when missing.
    pub output_folder: PathBuf,
    /// Asset-path prefix recorded in the asset for the exported textures.
    pub asset_dir: String,
    pub mesh: String,
    /// Playback material. Required: export refuses to run without one.
    pub material: Option<String>,
    /// How many clips the playback shader can address per instance.
    pub shader_clip_slots: u32,
}

impl Default for BakeSettings {
    fn default() -> Self {
        Self {
            output_name: "Baked".to_string(),
            output_folder: PathBuf::from("assets/vat"),
            asset_dir: "vat".to_string(),
            mesh: String::new(),
            material: None,
            shader_clip_slots: 8,
        }
    }
}

impl BakeSettings {
    pub fn from_ron_str(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(text)
    }

    pub fn safe_file_name(&self) -> String {
        sanitize_file_name(&self.output_name)
    }

    /// Asset path recorded for an exported file.
    pub fn asset_path(&self, file_name: &str) -> String {
        let dir = self.asset_dir.trim_end_matches('/');
        if dir.is_empty() {
            file_name.to_string()
        } else {
            format!("{dir}/{file_name}")
        }
    }
}

/// Replace characters that are not valid in a file name with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}
