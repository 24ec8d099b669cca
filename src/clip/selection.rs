// src/clip/selection.rs
//! The authoring-side bake selection: which states are ticked, how many frames
//! each clip gets, and the layout derived from both.

use bevy::prelude::*;

use super::state::{describe_states, ClipDescriptor, StateDescriptor};
use crate::layout::TextureLayout;
use crate::rig::AnimatedSource;

/// States of a two-motion blend contribute at most this many clips.
pub const MAX_CLIPS_PER_STATE: usize = 2;

#[derive(Clone, Debug)]
pub struct SelectableState {
    pub descriptor: StateDescriptor,
    pub selected: bool,
}

#[derive(Clone, Debug)]
pub struct BakeSelection {
    vertex_count: usize,
    states: Vec<SelectableState>,
    layout: TextureLayout,
}

impl BakeSelection {
    /// Every bakeable state starts selected.
    pub fn new(vertex_count: usize, states: Vec<StateDescriptor>) -> Self {
        let states = states
            .into_iter()
            .map(|descriptor| SelectableState { selected: descriptor.is_bakeable(), descriptor })
            .collect();
        let mut selection = Self { vertex_count, states, layout: TextureLayout::default() };
        selection.relayout();
        selection
    }

    pub fn from_source<S: AnimatedSource>(source: &S) -> Self {
        let selection = Self::new(source.vertex_count(), describe_states(source));
        info!(
            "Bake target '{}': {} states ({} bakeable), {} vertices",
            source.name(),
            selection.states.len(),
            selection.bakeable_count(),
            selection.vertex_count
        );
        selection
    }

    pub fn vertex_count(&self) -> usize { self.vertex_count }
    pub fn layout(&self) -> &TextureLayout { &self.layout }
    pub fn states(&self) -> &[SelectableState] { &self.states }

    pub fn state(&self, name: &str) -> Option<&SelectableState> {
        self.states.iter().find(|s| s.descriptor.name == name)
    }

    pub fn bakeable_count(&self) -> usize {
        self.states.iter().filter(|s| s.descriptor.is_bakeable()).count()
    }

    pub fn selected_count(&self) -> usize {
        self.states.iter().filter(|s| s.selected).count()
    }

    /// Select or deselect by name. Non-bakeable states cannot be selected.
    /// Returns whether the state ended up in the requested selection state.
    pub fn set_selected(&mut self, name: &str, selected: bool) -> bool {
        let Some(state) = self.states.iter_mut().find(|s| s.descriptor.name == name) else {
            return false;
        };
        if selected && !state.descriptor.is_bakeable() {
            return false;
        }
        if state.selected != selected {
            state.selected = selected;
            self.relayout();
        }
        true
    }

    pub fn select_all_bakeable(&mut self) {
        for s in &mut self.states {
            s.selected = s.descriptor.is_bakeable();
        }
        self.relayout();
    }

    pub fn clear(&mut self) {
        for s in &mut self.states {
            s.selected = false;
        }
        self.relayout();
    }

    /// Set the bake frame count of one clip of a state. Returns the clamped
    /// value actually stored, or `None` if the state/clip does not exist.
    pub fn set_frame_count(&mut self, state: &str, clip: usize, frames: u32) -> Option<u32> {
        let desc = self
            .states
            .iter_mut()
            .find(|s| s.descriptor.name == state)?
            .descriptor
            .clips
            .get_mut(clip)?;
        let stored = desc.set_bake_frames(frames);
        self.relayout();
        Some(stored)
    }

    /// Clips that will be baked, in layout slot order.
    pub fn selected_clips(&self) -> impl Iterator<Item = &ClipDescriptor> + '_ {
        self.states
            .iter()
            .filter(|s| s.selected)
            .flat_map(|s| s.descriptor.clips.iter().take(MAX_CLIPS_PER_STATE))
    }

    fn relayout(&mut self) {
        let counts: Vec<u32> = self.selected_clips().map(ClipDescriptor::bake_frames).collect();
        self.layout = TextureLayout::allocate(self.vertex_count, counts);
    }
}
