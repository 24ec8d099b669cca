//! Vertex animation textures for Bevy.
//!
//! Offline: sample the states of an animated rig (`rig`, `clip`), pack every
//! clip's frames into two RGBA8 textures (`layout`, `bake`) and describe the
//! result as a `BakedAnimationAsset` (`asset`). At runtime: draw any number of
//! instances of that asset with one instanced call per batch (`playback`).

use bevy::prelude::*;

pub mod asset;
pub mod bake;
pub mod clip;
pub mod layout;
pub mod playback;
pub mod rig;

pub use asset::{AnimationEntry, BakedAnimationAsset};
pub use bake::{bake, create_baked_asset, BakeError, BakeOutput, BakeSettings, ExportError};
pub use clip::BakeSelection;
pub use layout::TextureLayout;
pub use playback::{VatPlaybackConfig, VatRuntime, VertexAnimated};

/// Asset loader + playback.
pub struct VatPlugin;

impl Plugin for VatPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(asset::BakedAnimationAssetPlugin) // .vat.ron loader
            .add_plugins(playback::VatPlaybackPlugin); // batches + frame driver
    }
}
