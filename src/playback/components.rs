use bevy::prelude::*;
use std::collections::HashMap;

use super::InstanceId;
use crate::asset::BakedAnimationAsset;

/// Marks an entity for instanced VAT playback. Registration happens as soon as
/// the asset is loaded; removing the component (or despawning) unregisters.
#[derive(Component, Clone, Debug)]
pub struct VertexAnimated {
    pub asset: Handle<BakedAnimationAsset>,
    /// Entry to switch to right after registration (entry 0 otherwise).
    pub start_entry: Option<String>,
}

impl VertexAnimated {
    pub fn new(asset: Handle<BakedAnimationAsset>) -> Self {
        Self { asset, start_entry: None }
    }

    pub fn starting_with(mut self, entry: impl Into<String>) -> Self {
        self.start_entry = Some(entry.into());
        self
    }
}

/// Entity -> runtime instance, for registered entities.
#[derive(Resource, Default)]
pub struct AnimatedEntities {
    pub by_entity: HashMap<Entity, InstanceId>,
}

impl AnimatedEntities {
    pub fn get(&self, entity: Entity) -> Option<InstanceId> {
        self.by_entity.get(&entity).copied()
    }
}

/// Switch an entity to the entry called `name`. Unknown names are ignored.
#[derive(Event, Clone, Debug)]
pub struct PlayAnimation {
    pub entity: Entity,
    pub name: String,
}

#[derive(Event, Clone, Copy, Debug)]
pub struct SetPlaybackSpeed {
    pub entity: Entity,
    pub speed: f32,
}

/// Restart an entity's current entry from the beginning.
#[derive(Event, Clone, Copy, Debug)]
pub struct ResetAnimation(pub Entity);
