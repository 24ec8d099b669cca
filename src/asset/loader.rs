// src/asset/loader.rs
//! `.vat.ron` asset loader.

use bevy::asset::{io::Reader, AssetLoader, LoadContext};
use bevy::prelude::*;

use super::BakedAnimationAsset;

pub struct BakedAnimationAssetPlugin;

impl Plugin for BakedAnimationAssetPlugin {
    fn build(&self, app: &mut App) {
        app.init_asset::<BakedAnimationAsset>()
            .register_asset_loader(BakedAnimationLoader);
    }
}

#[derive(Default)]
pub struct BakedAnimationLoader;

impl AssetLoader for BakedAnimationLoader {
    type Asset = BakedAnimationAsset;
    type Settings = ();
    type Error = BakedAnimationLoadError;

    fn extensions(&self) -> &[&str] {
        &["vat.ron"]
    }

    async fn load(
        &self,
        reader: &mut dyn Reader,
        _settings: &Self::Settings,
        load_context: &mut LoadContext<'_>,
    ) -> Result<Self::Asset, Self::Error> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).await?;
        let asset = BakedAnimationAsset::from_ron_bytes(&bytes)
            .map_err(|e| BakedAnimationLoadError::Ron(e.to_string()))?;

        if asset.entries().is_empty() {
            return Err(BakedAnimationLoadError::NoEntries);
        }
        debug!(
            "Loaded baked animation '{}' ({} entries, {}x{})",
            load_context.path().display(),
            asset.entries().len(),
            asset.texture_size().x,
            asset.texture_size().y
        );
        Ok(asset)
    }
}

// ---------- Loader errors ----------

#[derive(thiserror::Error, Debug)]
pub enum BakedAnimationLoadError {
    #[error("I/O while reading baked animation: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Ron(String),
    #[error("Baked animation has no entries")]
    NoEntries,
}
