//! Clip/state model of a bake target.
//! - `graph`: the source's animation state graph
//! - `state`: bakeable states and per-clip frame counts
//! - `selection`: authoring selection + derived texture layout

pub mod graph;
pub mod selection;
pub mod state;

pub use graph::{BlendKind, GraphLayer, GraphState, Motion, StateGraph};
pub use selection::{BakeSelection, SelectableState};
pub use state::{describe_states, ClipDescriptor, MotionShape, StateDescriptor, MIN_BAKE_FRAMES};
