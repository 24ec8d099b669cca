//! GPU-instanced VAT playback.
//! Instances sharing a baked asset are packed into fixed-capacity batches; each
//! non-empty batch is one instanced draw per frame. The shader reconstructs the
//! clip time per instance from the begin/offset/speed (and clip index) arrays,
//! so the CPU only touches an array when an instance's playback changes.

use slotmap::new_key_type;

pub mod batch;
pub mod components;
pub mod draw;
pub mod instance;
pub mod plugin;
pub mod registry;
pub mod runtime;
pub mod systems;

new_key_type! {
    pub struct InstanceId;
    pub struct BatchId;
}

pub use batch::{DirtyArrays, InstanceBatch};
pub use components::{AnimatedEntities, PlayAnimation, ResetAnimation, SetPlaybackSpeed, VertexAnimated};
pub use draw::{InstancedDraw, InstancedDrawSink, PropertyBlock, RecordedDraw, VatDrawQueue};
pub use instance::{normalized_progress, SlotRef, VatInstance};
pub use plugin::VatPlaybackPlugin;
pub use registry::BatchRegistry;
pub use runtime::{VatPlaybackConfig, VatRuntime};
