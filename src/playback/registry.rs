// src/playback/registry.rs
//! Asset -> batches map plus the global draw order.

use bevy::prelude::*;
use slotmap::SlotMap;
use std::collections::HashMap;

use super::batch::InstanceBatch;
use super::instance::VatInstance;
use super::{BatchId, InstanceId};
use crate::asset::BakedAnimationAsset;

pub struct BatchRegistry {
    capacity: usize,
    batches: SlotMap<BatchId, InstanceBatch>,
    by_asset: HashMap<AssetId<BakedAnimationAsset>, Vec<BatchId>>,
    /// Creation order; batches draw in this order every frame.
    draw_order: Vec<BatchId>,
}

impl BatchRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            batches: SlotMap::with_key(),
            by_asset: HashMap::new(),
            draw_order: Vec::new(),
        }
    }

    pub fn capacity(&self) -> usize { self.capacity }
    pub fn len(&self) -> usize { self.batches.len() }
    pub fn is_empty(&self) -> bool { self.batches.is_empty() }

    pub fn get(&self, id: BatchId) -> Option<&InstanceBatch> { self.batches.get(id) }
    pub fn get_mut(&mut self, id: BatchId) -> Option<&mut InstanceBatch> { self.batches.get_mut(id) }

    pub fn batches_of(&self, asset: AssetId<BakedAnimationAsset>) -> &[BatchId] {
        self.by_asset.get(&asset).map_or(&[], Vec::as_slice)
    }

    pub fn draw_order(&self) -> &[BatchId] { &self.draw_order }

    /// Oldest batch of `asset_id` with a free slot, or a new one appended to
    /// both the asset's list and the draw order.
    pub fn acquire(&mut self, asset_id: AssetId<BakedAnimationAsset>, asset: &BakedAnimationAsset) -> BatchId {
        let list = self.by_asset.entry(asset_id).or_default();
        if let Some(id) = list.iter().copied().find(|id| self.batches.get(*id).is_some_and(|b| !b.is_full())) {
            return id;
        }

        let capacity = self.capacity;
        let id = self
            .batches
            .insert_with_key(|key| InstanceBatch::new(key, asset_id, asset, capacity));
        list.push(id);
        self.draw_order.push(id);
        info!(
            "VAT: new batch #{} for '{}' (capacity {}, {} batches total)",
            list.len(),
            asset.mesh(),
            capacity,
            self.batches.len()
        );
        id
    }

    /// Update then draw every batch in registration order. `resolve` maps an
    /// asset id to its asset; batches whose asset is gone are skipped.
    pub fn update_and_draw<'a>(
        &mut self,
        instances: &SlotMap<InstanceId, VatInstance>,
        resolve: impl Fn(AssetId<BakedAnimationAsset>) -> Option<&'a BakedAnimationAsset>,
        sink: &mut impl super::draw::InstancedDrawSink,
    ) -> usize {
        let mut draws = 0;
        for id in &self.draw_order {
            let Some(batch) = self.batches.get_mut(*id) else { continue };
            batch.update_frame(instances);
            let Some(asset) = resolve(batch.asset()) else { continue };
            if batch.draw_frame(asset, sink) {
                draws += 1;
            }
        }
        draws
    }

    /// Drop every batch of `asset_id`, unregistering their instances.
    /// Returns how many instances were unregistered.
    pub fn release_asset(
        &mut self,
        asset_id: AssetId<BakedAnimationAsset>,
        instances: &mut SlotMap<InstanceId, VatInstance>,
    ) -> usize {
        let Some(list) = self.by_asset.remove(&asset_id) else { return 0 };
        let mut released = 0;
        for id in &list {
            let Some(batch) = self.batches.remove(*id) else { continue };
            for inst in batch.instances() {
                if let Some(i) = instances.get_mut(*inst) {
                    i.set_slot(None);
                    released += 1;
                }
            }
        }
        self.draw_order.retain(|id| self.batches.contains_key(*id));
        debug!("VAT: released {} batches ({} instances)", list.len(), released);
        released
    }
}
