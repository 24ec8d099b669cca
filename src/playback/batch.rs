// src/playback/batch.rs
//! Dense, capacity-bounded pool of instances sharing one baked asset and one
//! instanced draw.

use bevy::prelude::*;
use slotmap::SlotMap;

use super::draw::{InstancedDraw, InstancedDrawSink, PropertyBlock};
use super::instance::{SlotRef, VatInstance};
use super::{BatchId, InstanceId};
use crate::asset::BakedAnimationAsset;

/// Which per-instance arrays changed since the last upload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DirtyArrays {
    pub begin: bool,
    pub offset: bool,
    pub speed: bool,
    pub clip_index: bool,
}

impl DirtyArrays {
    fn all(multi_clip: bool) -> Self {
        Self { begin: true, offset: true, speed: true, clip_index: multi_clip }
    }

    pub fn any(&self) -> bool {
        self.begin || self.offset || self.speed || self.clip_index
    }
}

pub struct InstanceBatch {
    id: BatchId,
    asset: AssetId<BakedAnimationAsset>,
    capacity: usize,
    multi_clip: bool,
    /// Playable entries; clip indices are clamped below this.
    available: usize,
    /// Active slots `[0, count)`.
    instances: Vec<InstanceId>,
    begin: Vec<f32>,
    offset: Vec<f32>,
    speed: Vec<f32>,
    clip_index: Vec<f32>,
    transforms: Vec<Mat4>,
    dirty: DirtyArrays,
    block: PropertyBlock,
}

impl InstanceBatch {
    pub fn new(id: BatchId, asset_id: AssetId<BakedAnimationAsset>, asset: &BakedAnimationAsset, capacity: usize) -> Self {
        let multi_clip = asset.is_multi_clip();
        Self {
            id,
            asset: asset_id,
            capacity,
            multi_clip,
            available: asset.available_count().max(1),
            instances: Vec::with_capacity(capacity),
            begin: vec![0.0; capacity],
            offset: vec![0.0; capacity],
            speed: vec![1.0; capacity],
            clip_index: if multi_clip { vec![0.0; capacity] } else { Vec::new() },
            transforms: vec![Mat4::IDENTITY; capacity],
            dirty: DirtyArrays { offset: true, speed: true, ..default() },
            block: PropertyBlock::default(),
        }
    }

    pub fn id(&self) -> BatchId { self.id }
    pub fn asset(&self) -> AssetId<BakedAnimationAsset> { self.asset }
    pub fn capacity(&self) -> usize { self.capacity }
    pub fn count(&self) -> usize { self.instances.len() }
    pub fn is_empty(&self) -> bool { self.instances.is_empty() }
    pub fn is_full(&self) -> bool { self.instances.len() >= self.capacity }
    pub fn is_multi_clip(&self) -> bool { self.multi_clip }
    pub fn instances(&self) -> &[InstanceId] { &self.instances }
    pub fn dirty(&self) -> DirtyArrays { self.dirty }
    pub fn block(&self) -> &PropertyBlock { &self.block }

    /// Draw transforms of the active slots.
    pub fn transforms(&self) -> &[Mat4] {
        &self.transforms[..self.instances.len()]
    }

    pub fn contains(&self, id: InstanceId, instance: &VatInstance) -> bool {
        matches!(instance.slot(), Some(s) if s.batch == self.id && self.instances.get(s.slot) == Some(&id))
    }

    /// Append `instance` at slot `count`. No-op when it is already registered
    /// or the batch is full.
    pub fn add(&mut self, id: InstanceId, instance: &mut VatInstance) -> bool {
        if instance.is_registered() || self.is_full() {
            return false;
        }
        let slot = self.instances.len();
        self.instances.push(id);
        instance.set_slot(Some(SlotRef { batch: self.id, slot }));

        self.transforms[slot] = instance.transform.compute_matrix();
        self.sync_clock(slot, instance);
        self.sync_speed(slot, instance);
        self.sync_clip(slot, instance);
        true
    }

    /// Swap-with-last removal. No-op when `id` is not in this batch.
    pub fn remove(&mut self, id: InstanceId, instances: &mut SlotMap<InstanceId, VatInstance>) -> bool {
        let Some(slot) = instances.get(id).filter(|i| self.contains(id, i)).and_then(VatInstance::slot) else {
            return false;
        };
        let slot = slot.slot;
        let last = self.instances.len() - 1;

        self.instances.swap_remove(slot);
        if slot != last {
            self.begin[slot] = self.begin[last];
            self.offset[slot] = self.offset[last];
            self.speed[slot] = self.speed[last];
            if self.multi_clip {
                self.clip_index[slot] = self.clip_index[last];
            }
            self.transforms[slot] = self.transforms[last];
            self.dirty = DirtyArrays::all(self.multi_clip);

            let moved = self.instances[slot];
            if let Some(m) = instances.get_mut(moved) {
                m.set_slot(Some(SlotRef { batch: self.id, slot }));
            }
        }

        if let Some(removed) = instances.get_mut(id) {
            removed.set_slot(None);
        }
        true
    }

    /// Copy begin + offset of the instance in `slot`.
    pub(crate) fn sync_clock(&mut self, slot: usize, instance: &VatInstance) {
        self.begin[slot] = instance.begin();
        self.offset[slot] = instance.offset();
        self.dirty.begin = true;
        self.dirty.offset = true;
    }

    /// Speed changes move the offset too.
    pub(crate) fn sync_speed(&mut self, slot: usize, instance: &VatInstance) {
        self.speed[slot] = instance.speed();
        self.offset[slot] = instance.offset();
        self.dirty.speed = true;
        self.dirty.offset = true;
    }

    pub(crate) fn sync_clip(&mut self, slot: usize, instance: &VatInstance) {
        if !self.multi_clip {
            return;
        }
        self.clip_index[slot] = instance.active().min(self.available - 1) as f32;
        self.dirty.clip_index = true;
    }

    /// Refresh draw transforms from the owning instances and upload every dirty
    /// array (whole array). Returns how many arrays were uploaded.
    pub fn update_frame(&mut self, instances: &SlotMap<InstanceId, VatInstance>) -> u32 {
        if self.instances.is_empty() {
            return 0;
        }
        for (slot, id) in self.instances.iter().enumerate() {
            if let Some(inst) = instances.get(*id) {
                self.transforms[slot] = inst.transform.compute_matrix();
            }
        }

        let mut uploaded = 0;
        if self.dirty.begin {
            self.block.begin.clone_from(&self.begin);
            uploaded += 1;
        }
        if self.dirty.offset {
            self.block.offset.clone_from(&self.offset);
            uploaded += 1;
        }
        if self.dirty.speed {
            self.block.speed.clone_from(&self.speed);
            uploaded += 1;
        }
        if self.dirty.clip_index {
            self.block.clip_index.clone_from(&self.clip_index);
            uploaded += 1;
        }
        self.block.uploads += uploaded;
        self.dirty = DirtyArrays::default();
        uploaded
    }

    /// One instanced draw of the active slots; nothing when empty.
    pub fn draw_frame(&self, asset: &BakedAnimationAsset, sink: &mut impl InstancedDrawSink) -> bool {
        if self.instances.is_empty() {
            return false;
        }
        sink.draw_instanced(InstancedDraw {
            batch: self.id,
            mesh: asset.mesh(),
            material: asset.material(),
            transforms: self.transforms(),
            block: &self.block,
        });
        true
    }

    /// Every active slot's instance points back at this batch and slot.
    pub fn is_consistent(&self, instances: &SlotMap<InstanceId, VatInstance>) -> bool {
        self.instances.len() <= self.capacity
            && self.instances.iter().enumerate().all(|(slot, id)| {
                instances.get(*id).and_then(VatInstance::slot) == Some(SlotRef { batch: self.id, slot })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::fixtures::soldier_asset;
    use crate::playback::draw::VatDrawQueue;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn setup(capacity: usize) -> (InstanceBatch, SlotMap<InstanceId, VatInstance>, BakedAnimationAsset) {
        let asset = soldier_asset(4);
        let mut batches: SlotMap<BatchId, ()> = SlotMap::with_key();
        let batch = InstanceBatch::new(batches.insert(()), AssetId::default(), &asset, capacity);
        (batch, SlotMap::with_key(), asset)
    }

    fn spawn(instances: &mut SlotMap<InstanceId, VatInstance>, x: f32) -> InstanceId {
        instances.insert(VatInstance::new(AssetId::default(), Transform::from_xyz(x, 0.0, 0.0)))
    }

    #[test]
    fn removing_first_of_two_swaps_last_down() {
        let (mut batch, mut instances, _) = setup(2);
        let x = spawn(&mut instances, 1.0);
        let y = spawn(&mut instances, 2.0);
        assert!(batch.add(x, &mut instances[x]));
        assert!(batch.add(y, &mut instances[y]));
        assert_eq!(instances[y].slot().map(|s| s.slot), Some(1));

        let z = spawn(&mut instances, 3.0);
        assert!(!batch.add(z, &mut instances[z]), "full");
        assert!(!batch.add(x, &mut instances[x]), "already present");

        assert!(batch.remove(x, &mut instances));
        assert_eq!(batch.instances(), &[y]);
        assert_eq!(instances[y].slot(), Some(SlotRef { batch: batch.id(), slot: 0 }));
        assert_eq!(instances[x].slot(), None);
        assert_eq!(batch.transforms()[0].w_axis.x, 2.0);
        assert!(!batch.remove(x, &mut instances));
    }

    #[test]
    fn slots_stay_dense_under_churn() {
        let (mut batch, mut instances, _) = setup(8);
        let ids: Vec<_> = (0..16).map(|i| spawn(&mut instances, i as f32)).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        for _ in 0..400 {
            let id = ids[rng.random_range(0..ids.len())];
            if rng.random_bool(0.5) {
                batch.add(id, &mut instances[id]);
            } else {
                batch.remove(id, &mut instances);
            }
            assert!(batch.count() <= batch.capacity());
            assert!(batch.is_consistent(&instances));
        }
    }

    #[test]
    fn only_dirty_arrays_upload() {
        let (mut batch, mut instances, _) = setup(4);
        let a = spawn(&mut instances, 0.0);
        batch.add(a, &mut instances[a]);
        assert_eq!(batch.update_frame(&instances), 4);
        assert_eq!(batch.update_frame(&instances), 0);

        instances[a].set_active(2);
        batch.sync_clip(0, &instances[a]);
        assert_eq!(batch.dirty(), DirtyArrays { clip_index: true, ..default() });
        assert_eq!(batch.update_frame(&instances), 1);
        assert_eq!(batch.block().clip_index[0], 2.0);
        assert_eq!(batch.block().uploads, 5);
    }

    #[test]
    fn clip_index_is_clamped_to_shader_slots() {
        let asset = soldier_asset(2);
        let mut keys: SlotMap<BatchId, ()> = SlotMap::with_key();
        let mut batch = InstanceBatch::new(keys.insert(()), AssetId::default(), &asset, 4);
        let mut instances = SlotMap::with_key();
        let a = spawn(&mut instances, 0.0);
        instances[a].set_active(2);
        batch.add(a, &mut instances[a]);
        batch.update_frame(&instances);
        assert_eq!(batch.block().clip_index[0], 1.0);
    }

    #[test]
    fn draw_follows_transforms_and_skips_when_empty() {
        let (mut batch, mut instances, asset) = setup(4);
        let mut queue = VatDrawQueue::default();
        assert!(!batch.draw_frame(&asset, &mut queue));
        assert!(queue.draws.is_empty());

        let a = spawn(&mut instances, 0.0);
        batch.add(a, &mut instances[a]);
        instances[a].transform.translation = Vec3::new(5.0, 1.0, 0.0);
        batch.update_frame(&instances);
        assert!(batch.draw_frame(&asset, &mut queue));

        let draw = &queue.draws[0];
        assert_eq!(draw.transforms.len(), 1);
        assert_eq!(draw.transforms[0].w_axis.truncate(), Vec3::new(5.0, 1.0, 0.0));
        assert_eq!(draw.material, "materials/vat_soldier");
    }
}
