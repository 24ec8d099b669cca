// src/clip/graph.rs
//! Animation state graph of a source object (layers → states → motions).

use crate::rig::ClipId;

/// Blend tree parameterization. Only `Simple1D` with two clip children is
/// baked as a two-motion blend; every other shape falls back to its first clip.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlendKind {
    Simple1D,
    SimpleDirectional2D,
    FreeformDirectional2D,
    FreeformCartesian2D,
    Direct,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Motion {
    Clip(ClipId),
    Blend { kind: BlendKind, children: Vec<Motion> },
    /// State with no motion assigned.
    Empty,
}

impl Motion {
    pub fn blend(kind: BlendKind, children: Vec<Motion>) -> Self {
        Motion::Blend { kind, children }
    }

    pub fn as_clip(&self) -> Option<ClipId> {
        match self {
            Motion::Clip(id) => Some(*id),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct GraphState {
    pub name: String,
    pub motion: Motion,
}

#[derive(Clone, Debug, Default)]
pub struct GraphLayer {
    pub states: Vec<GraphState>,
    /// Index into `states`.
    pub default_state: Option<usize>,
}

impl GraphLayer {
    pub fn add_state(&mut self, name: impl Into<String>, motion: Motion) -> usize {
        self.states.push(GraphState { name: name.into(), motion });
        self.states.len() - 1
    }

    /// Default state first, then the remaining states in authored order.
    pub fn ordered_states(&self) -> impl Iterator<Item = &GraphState> + '_ {
        let default = self.default_state.and_then(|i| self.states.get(i));
        default.into_iter().chain(
            self.states
                .iter()
                .enumerate()
                .filter(move |(i, _)| Some(*i) != self.default_state)
                .map(|(_, s)| s),
        )
    }
}

#[derive(Clone, Debug, Default)]
pub struct StateGraph {
    pub layers: Vec<GraphLayer>,
}

impl StateGraph {
    pub fn ordered_states(&self) -> impl Iterator<Item = &GraphState> + '_ {
        self.layers.iter().flat_map(GraphLayer::ordered_states)
    }
}
