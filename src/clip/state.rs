// src/clip/state.rs
//! Which states of a source are bakeable, and how many frames each clip gets.

use bevy::prelude::*;

use super::graph::{BlendKind, Motion};
use crate::rig::{AnimatedSource, AnimationClip, ClipId};

/// Smallest bake: first and last frame.
pub const MIN_BAKE_FRAMES: u32 = 2;

// ---------- Motion shape ----------

/// How a state's motion resolves into bakeable clips.
#[derive(Clone, Debug, PartialEq)]
pub enum MotionShape {
    SingleClip(ClipId),
    /// 1D blend between exactly two clips (e.g. walk/run).
    TwoMotionBlend(ClipId, ClipId),
    /// Unsupported blend shape; only its first direct clip child is baked.
    FirstClipFallback(ClipId),
    Unsupported(String),
}

impl MotionShape {
    pub fn resolve(motion: &Motion) -> Self {
        match motion {
            Motion::Clip(id) => MotionShape::SingleClip(*id),
            Motion::Blend { kind: BlendKind::Simple1D, children } if children.len() == 2 => {
                match (children[0].as_clip(), children[1].as_clip()) {
                    (Some(a), Some(b)) if a == b => MotionShape::SingleClip(a),
                    (Some(a), Some(b)) => MotionShape::TwoMotionBlend(a, b),
                    _ => Self::first_clip(children),
                }
            }
            Motion::Blend { children, .. } => Self::first_clip(children),
            Motion::Empty => MotionShape::Unsupported("no blend tree or animation clip".into()),
        }
    }

    fn first_clip(children: &[Motion]) -> Self {
        match children.iter().find_map(Motion::as_clip) {
            Some(id) => MotionShape::FirstClipFallback(id),
            None => MotionShape::Unsupported("can not find any clip".into()),
        }
    }

    pub fn clips(&self) -> Vec<ClipId> {
        match self {
            MotionShape::SingleClip(a) | MotionShape::FirstClipFallback(a) => vec![*a],
            MotionShape::TwoMotionBlend(a, b) => vec![*a, *b],
            MotionShape::Unsupported(_) => Vec::new(),
        }
    }
}

// ---------- Clip descriptor ----------

#[derive(Clone, Debug, PartialEq)]
pub struct ClipDescriptor {
    pub clip: ClipId,
    pub name: String,
    pub sample_rate: f32,
    /// Seconds.
    pub duration: f32,
    pub looping: bool,
    pub native_frames: u32,
    bake_frames: u32,
}

impl ClipDescriptor {
    pub fn from_clip(id: ClipId, clip: &AnimationClip) -> Self {
        let native_frames = clip.native_frame_count();
        let mut desc = Self {
            clip: id,
            name: clip.name.clone(),
            sample_rate: clip.sample_rate,
            duration: clip.duration,
            looping: clip.looping,
            native_frames,
            bake_frames: MIN_BAKE_FRAMES,
        };
        desc.set_bake_frames((native_frames as f32 * 0.5).ceil() as u32);
        desc
    }

    pub fn bake_frames(&self) -> u32 { self.bake_frames }

    pub fn max_bake_frames(&self) -> u32 { self.native_frames.max(MIN_BAKE_FRAMES) }

    /// Clamp into `[2, max(native, 2)]`; returns the stored value.
    pub fn set_bake_frames(&mut self, frames: u32) -> u32 {
        self.bake_frames = frames.clamp(MIN_BAKE_FRAMES, self.max_bake_frames());
        self.bake_frames
    }

    /// Seconds between two baked frames.
    pub fn frame_step(&self) -> f32 {
        self.duration / (self.bake_frames - 1) as f32
    }

    pub fn frame_time(&self, frame: u32) -> f32 {
        frame as f32 * self.frame_step()
    }

    /// True when the bake drops frames relative to the authored clip.
    pub fn is_downsampled(&self) -> bool { self.bake_frames < self.native_frames }
}

// ---------- State descriptor ----------

#[derive(Clone, Debug, PartialEq)]
pub struct StateDescriptor {
    pub name: String,
    pub shape: MotionShape,
    /// One entry, or two for a two-motion blend. Empty when not bakeable.
    pub clips: Vec<ClipDescriptor>,
}

impl StateDescriptor {
    pub fn from_motion<S: AnimatedSource>(name: &str, motion: &Motion, source: &S) -> Self {
        let mut shape = MotionShape::resolve(motion);
        let mut clips = Vec::new();
        for id in shape.clips() {
            match source.clip(id) {
                Some(clip) => clips.push(ClipDescriptor::from_clip(id, clip)),
                None => {
                    shape = MotionShape::Unsupported(format!("clip {} missing from source", id.0));
                    clips.clear();
                    break;
                }
            }
        }

        if let MotionShape::FirstClipFallback(_) = shape {
            warn!(
                "State '{}' of '{}' uses an unsupported blend shape; baking its first clip only",
                name,
                source.name()
            );
        }

        Self { name: name.to_string(), shape, clips }
    }

    pub fn is_bakeable(&self) -> bool {
        !matches!(self.shape, MotionShape::Unsupported(_))
    }

    pub fn non_bakeable_reason(&self) -> Option<&str> {
        match &self.shape {
            MotionShape::Unsupported(reason) => Some(reason.as_str()),
            _ => None,
        }
    }

    /// Baked data only approximates the authored blend.
    pub fn is_approximation(&self) -> bool {
        matches!(self.shape, MotionShape::FirstClipFallback(_))
    }

    pub fn is_blend(&self) -> bool {
        matches!(self.shape, MotionShape::TwoMotionBlend(..))
    }
}

/// Derive descriptors for every state of the source's graph (empty without one).
pub fn describe_states<S: AnimatedSource>(source: &S) -> Vec<StateDescriptor> {
    let Some(graph) = source.state_graph() else { return Vec::new() };
    graph
        .ordered_states()
        .map(|s| StateDescriptor::from_motion(&s.name, &s.motion, source))
        .collect()
}
