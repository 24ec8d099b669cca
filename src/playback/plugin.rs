// src/playback/plugin.rs

use bevy::prelude::*;

use super::components::{AnimatedEntities, PlayAnimation, ResetAnimation, SetPlaybackSpeed};
use super::draw::VatDrawQueue;
use super::runtime::{VatPlaybackConfig, VatRuntime};
use super::systems::*;

/// Instanced playback of `VertexAnimated` entities. Insert a
/// `VatPlaybackConfig` before adding the plugin to override the defaults.
pub struct VatPlaybackPlugin;

impl Plugin for VatPlaybackPlugin {
    fn build(&self, app: &mut App) {
        let config = app
            .world()
            .get_resource::<VatPlaybackConfig>()
            .cloned()
            .unwrap_or_default();
        info!(
            "VAT: playback batch capacity {}, default offset randomization {}",
            config.batch_capacity, config.randomize_default_offset
        );

        app.insert_resource(VatRuntime::new(config.clone()))
            .insert_resource(config)
            .init_resource::<AnimatedEntities>()
            .init_resource::<VatDrawQueue>()
            .add_event::<PlayAnimation>()
            .add_event::<SetPlaybackSpeed>()
            .add_event::<ResetAnimation>()
            .add_systems(
                Update,
                (
                    release_unloaded_assets,
                    unregister_removed,
                    reregister_changed_assets,
                    register_vertex_animated,
                    sync_transforms,
                    apply_playback_events,
                    drive_batches,
                )
                    .chain(),
            );
    }
}
