// src/playback/instance.rs
//! Per-instance playback state and the clock math the shader mirrors.

use bevy::prelude::*;

use super::BatchId;
use crate::asset::{AnimationEntry, BakedAnimationAsset};

/// Where an instance lives: batch + dense slot index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SlotRef {
    pub batch: BatchId,
    pub slot: usize,
}

/// `offset + (now - begin) * speed`, wrapped or clamped into the entry length,
/// divided by that length. Zero-length entries report 0.
pub fn normalized_progress(entry: &AnimationEntry, elapsed: f32) -> f32 {
    let length = entry.length;
    if length <= 0.0 {
        return 0.0;
    }
    let progress = if entry.is_loop {
        elapsed.rem_euclid(length)
    } else {
        elapsed.clamp(0.0, length)
    };
    progress / length
}

#[derive(Clone, Debug)]
pub struct VatInstance {
    pub asset: AssetId<BakedAnimationAsset>,
    pub transform: Transform,
    active: usize,
    begin: f32,
    offset: f32,
    speed: f32,
    slot: Option<SlotRef>,
}

impl VatInstance {
    pub fn new(asset: AssetId<BakedAnimationAsset>, transform: Transform) -> Self {
        Self { asset, transform, active: 0, begin: 0.0, offset: 0.0, speed: 1.0, slot: None }
    }

    pub fn active(&self) -> usize { self.active }
    pub fn begin(&self) -> f32 { self.begin }
    pub fn offset(&self) -> f32 { self.offset }
    pub fn speed(&self) -> f32 { self.speed }
    pub fn slot(&self) -> Option<SlotRef> { self.slot }
    pub fn is_registered(&self) -> bool { self.slot.is_some() }

    pub(crate) fn set_slot(&mut self, slot: Option<SlotRef>) {
        self.slot = slot;
    }

    pub(crate) fn set_active(&mut self, index: usize) {
        self.active = index;
    }

    /// Restart at `now` with the given start offset.
    pub(crate) fn restart(&mut self, now: f32, offset: f32) {
        self.begin = now;
        self.offset = offset;
    }

    pub fn elapsed(&self, now: f32) -> f32 {
        self.offset + (now - self.begin) * self.speed
    }

    /// Change speed without a jump: the elapsed time at `now` is kept, so the
    /// normalized progress is too. Returns false when the speed is unchanged.
    pub(crate) fn change_speed(&mut self, now: f32, speed: f32) -> bool {
        if (self.speed - speed).abs() <= f32::EPSILON * self.speed.abs().max(speed.abs()).max(1.0) {
            return false;
        }
        let elapsed = self.elapsed(now);
        self.speed = speed;
        self.offset = elapsed - (now - self.begin) * speed;
        true
    }

    pub fn progress(&self, asset: &BakedAnimationAsset, now: f32) -> Option<f32> {
        asset.entry(self.active).map(|e| normalized_progress(e, self.elapsed(now)))
    }
}
