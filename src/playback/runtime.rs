// src/playback/runtime.rs
//! The playback context: owns instances and batches, and is handed to
//! whoever drives them (a Bevy resource in the plugin, a plain value in tests).

use bevy::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use super::draw::InstancedDrawSink;
use super::instance::VatInstance;
use super::registry::BatchRegistry;
use super::{BatchId, InstanceId};
use crate::asset::BakedAnimationAsset;

#[derive(Resource, Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct VatPlaybackConfig {
    /// Instances per batch (one instanced draw each).
    pub batch_capacity: usize,
    /// Start default-entry playback at a random offset so crowds desync.
    pub randomize_default_offset: bool,
    pub seed: u64,
}

impl Default for VatPlaybackConfig {
    fn default() -> Self {
        Self {
            batch_capacity: 128,
            randomize_default_offset: true,
            seed: 1337,
        }
    }
}

#[derive(Resource)]
pub struct VatRuntime {
    config: VatPlaybackConfig,
    instances: SlotMap<InstanceId, VatInstance>,
    registry: BatchRegistry,
    rng: ChaCha8Rng,
    now: f32,
}

impl Default for VatRuntime {
    fn default() -> Self {
        Self::new(VatPlaybackConfig::default())
    }
}

impl VatRuntime {
    pub fn new(config: VatPlaybackConfig) -> Self {
        Self {
            registry: BatchRegistry::new(config.batch_capacity),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            instances: SlotMap::with_key(),
            now: 0.0,
            config,
        }
    }

    pub fn config(&self) -> &VatPlaybackConfig { &self.config }
    pub fn now(&self) -> f32 { self.now }
    pub fn registry(&self) -> &BatchRegistry { &self.registry }
    pub fn instance(&self, id: InstanceId) -> Option<&VatInstance> { self.instances.get(id) }
    pub fn instance_count(&self) -> usize { self.instances.len() }

    /// Advance the clock without drawing.
    pub fn set_time(&mut self, now: f32) {
        self.now = now;
    }

    /// New unregistered instance on entry 0.
    pub fn spawn(&mut self, asset: AssetId<BakedAnimationAsset>, transform: Transform) -> InstanceId {
        self.instances.insert(VatInstance::new(asset, transform))
    }

    /// Put the instance into a batch of its asset and restart its active entry.
    pub fn register(&mut self, id: InstanceId, assets: &Assets<BakedAnimationAsset>) -> bool {
        let Some(inst) = self.instances.get(id) else { return false };
        if inst.is_registered() {
            return false;
        }
        let (asset_id, active) = (inst.asset, inst.active());
        let Some(asset) = assets.get(asset_id) else {
            debug!("VAT: asset {:?} not loaded; instance stays unregistered", asset_id);
            return false;
        };

        let offset = self.start_offset(active, asset);
        let now = self.now;
        let Some(inst) = self.instances.get_mut(id) else { return false };
        inst.restart(now, offset);

        let batch_id = self.registry.acquire(asset_id, asset);
        match self.registry.get_mut(batch_id) {
            Some(batch) => batch.add(id, inst),
            None => false,
        }
    }

    pub fn unregister(&mut self, id: InstanceId) -> bool {
        let Some(slot) = self.instances.get(id).and_then(VatInstance::slot) else { return false };
        match self.registry.get_mut(slot.batch) {
            Some(batch) => batch.remove(id, &mut self.instances),
            None => false,
        }
    }

    pub fn despawn(&mut self, id: InstanceId) -> bool {
        self.unregister(id);
        self.instances.remove(id).is_some()
    }

    /// Switch to the entry called `name` and restart it. False when the name
    /// is unknown or already playing; nothing changes then.
    pub fn play(&mut self, id: InstanceId, name: &str, assets: &Assets<BakedAnimationAsset>) -> bool {
        let Some(inst) = self.instances.get(id) else { return false };
        let active = inst.active();
        let Some(asset) = assets.get(inst.asset) else { return false };
        let Some(index) = asset.index_of(name) else { return false };
        if index == active {
            return false;
        }

        let offset = self.start_offset(index, asset);
        let now = self.now;
        let Some(inst) = self.instances.get_mut(id) else { return false };
        inst.set_active(index);
        inst.restart(now, offset);
        self.sync_batch(id, true, true, false);
        true
    }

    /// Restart the active entry from its beginning.
    pub fn reset(&mut self, id: InstanceId) -> bool {
        let now = self.now;
        let Some(inst) = self.instances.get_mut(id) else { return false };
        inst.restart(now, 0.0);
        self.sync_batch(id, false, true, false);
        true
    }

    pub fn set_speed(&mut self, id: InstanceId, speed: f32) -> bool {
        let now = self.now;
        let Some(inst) = self.instances.get_mut(id) else { return false };
        if !inst.change_speed(now, speed) {
            return false;
        }
        self.sync_batch(id, false, false, true);
        true
    }

    pub fn set_transform(&mut self, id: InstanceId, transform: Transform) -> bool {
        match self.instances.get_mut(id) {
            Some(inst) => {
                inst.transform = transform;
                true
            }
            None => false,
        }
    }

    pub fn normalized_progress(&self, id: InstanceId, assets: &Assets<BakedAnimationAsset>) -> Option<f32> {
        let inst = self.instances.get(id)?;
        inst.progress(assets.get(inst.asset)?, self.now)
    }

    /// Name of the entry the instance is playing.
    pub fn active_entry<'a>(&self, id: InstanceId, assets: &'a Assets<BakedAnimationAsset>) -> Option<&'a str> {
        let inst = self.instances.get(id)?;
        assets.get(inst.asset)?.entry(inst.active()).map(|e| e.name.as_str())
    }

    /// One frame: update then draw every batch in registration order.
    /// Returns the number of draws issued.
    pub fn tick(&mut self, now: f32, assets: &Assets<BakedAnimationAsset>, sink: &mut impl InstancedDrawSink) -> usize {
        self.now = now;
        self.registry.update_and_draw(&self.instances, |id| assets.get(id), sink)
    }

    /// Tear down the batches of an unloaded asset.
    pub fn release_asset(&mut self, asset: AssetId<BakedAnimationAsset>) -> usize {
        self.registry.release_asset(asset, &mut self.instances)
    }

    pub fn batch_of(&self, id: InstanceId) -> Option<BatchId> {
        self.instances.get(id)?.slot().map(|s| s.batch)
    }

    /// Offset for a fresh start of entry `index`: random in `[0, length)` only
    /// for the default entry.
    fn start_offset(&mut self, index: usize, asset: &BakedAnimationAsset) -> f32 {
        if index != 0 || !self.config.randomize_default_offset {
            return 0.0;
        }
        match asset.entry(0) {
            Some(e) if e.length > 0.0 => self.rng.random_range(0.0..e.length),
            _ => 0.0,
        }
    }

    fn sync_batch(&mut self, id: InstanceId, clip: bool, clock: bool, speed: bool) {
        let Some(inst) = self.instances.get(id) else { return };
        let Some(slot) = inst.slot() else { return };
        let Some(batch) = self.registry.get_mut(slot.batch) else { return };
        if clip {
            batch.sync_clip(slot.slot, inst);
        }
        if clock {
            batch.sync_clock(slot.slot, inst);
        }
        if speed {
            batch.sync_speed(slot.slot, inst);
        }
    }
}
