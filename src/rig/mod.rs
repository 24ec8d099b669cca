//! Animated source objects the baker samples.
//! `AnimatedSource` is the seam: anything that can expose a state graph,
//! its clips, and hand out a disposable sampler can be baked. `SkinnedRig`
//! is the CPU implementation (bone hierarchy + keyframes + linear blend skinning).

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::bake::BakeError;
use crate::clip::graph::StateGraph;

pub mod skeleton;
pub mod skinning;

pub use skeleton::{AnimationClip, BoneTrack, Keyframe, Skeleton};
pub use skinning::SkinnedMesh;

/// Index of a clip inside its source (stable for the source's lifetime).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClipId(pub u32);

/// One evaluated frame of mesh geometry. `normals` is empty when the mesh has none.
#[derive(Clone, Debug, Default)]
pub struct SampledFrame {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
}

// ---------- Traits ----------

/// Something that can be baked.
pub trait AnimatedSource {
    type Sampler: MeshSampler;

    fn name(&self) -> &str;
    /// Vertex count of the skinned mesh; 0 when there is none.
    fn vertex_count(&self) -> usize;
    /// The animation state graph, if the source has an animator.
    fn state_graph(&self) -> Option<&StateGraph>;
    fn clip(&self, id: ClipId) -> Option<&AnimationClip>;
    /// Disposable sampling copy, expressed in the mesh root's local space.
    fn instantiate_sampler(&self) -> Result<Self::Sampler, BakeError>;
}

/// Evaluates the mesh at a clip time.
pub trait MeshSampler {
    fn vertex_count(&self) -> usize;
    /// Returns false when `clip` is unknown; `out` is left untouched then.
    fn sample(&mut self, clip: ClipId, time: f32, out: &mut SampledFrame) -> bool;
}

// ---------- Skinned rig ----------

#[derive(Clone, Debug, Default)]
pub struct SkinnedRig {
    pub name: String,
    pub skeleton: Skeleton,
    pub mesh: Option<SkinnedMesh>,
    pub clips: Vec<AnimationClip>,
    pub graph: Option<StateGraph>,
    /// Scene transforms above the mesh root, outermost first.
    pub ancestors: Vec<Transform>,
}

impl SkinnedRig {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    pub fn add_clip(&mut self, clip: AnimationClip) -> ClipId {
        self.clips.push(clip);
        ClipId(self.clips.len() as u32 - 1)
    }

    pub fn clip_id(&self, name: &str) -> Option<ClipId> {
        self.clips.iter().position(|c| c.name == name).map(|i| ClipId(i as u32))
    }

    /// World matrix of the mesh root as placed in the scene.
    pub fn scene_matrix(&self) -> Mat4 {
        self.ancestors
            .iter()
            .fold(Mat4::IDENTITY, |acc, t| acc * t.compute_matrix())
    }

    /// Sampler that keeps the scene placement (world space output).
    pub fn scene_sampler(&self) -> Option<RigSampler> {
        let mesh = self.mesh.clone()?;
        Some(RigSampler::new(self.skeleton.clone(), mesh, self.clips.clone(), self.scene_matrix()))
    }
}

impl AnimatedSource for SkinnedRig {
    type Sampler = RigSampler;

    fn name(&self) -> &str { &self.name }

    fn vertex_count(&self) -> usize {
        self.mesh.as_ref().map_or(0, SkinnedMesh::vertex_count)
    }

    fn state_graph(&self) -> Option<&StateGraph> { self.graph.as_ref() }

    fn clip(&self, id: ClipId) -> Option<&AnimationClip> {
        self.clips.get(id.0 as usize)
    }

    fn instantiate_sampler(&self) -> Result<RigSampler, BakeError> {
        let mesh = self
            .mesh
            .clone()
            .filter(|m| m.vertex_count() > 0)
            .ok_or_else(|| BakeError::MissingSkinnedMesh(self.name.clone()))?;
        // Ancestors are neutralized: the copy always samples at the identity root.
        Ok(RigSampler::new(self.skeleton.clone(), mesh, self.clips.clone(), Mat4::IDENTITY))
    }
}

/// Owned sampling copy of a rig. Dropping it releases the copy.
pub struct RigSampler {
    skeleton: Skeleton,
    mesh: SkinnedMesh,
    clips: Vec<AnimationClip>,
    root: Mat4,
    pose: Vec<Transform>,
    globals: Vec<Mat4>,
    joints: Vec<Mat4>,
}

impl RigSampler {
    pub fn new(skeleton: Skeleton, mesh: SkinnedMesh, clips: Vec<AnimationClip>, root: Mat4) -> Self {
        let bones = skeleton.len();
        Self {
            skeleton,
            mesh,
            clips,
            root,
            pose: Vec::with_capacity(bones),
            globals: Vec::with_capacity(bones),
            joints: Vec::with_capacity(bones),
        }
    }

    pub fn root(&self) -> Mat4 { self.root }
}

impl MeshSampler for RigSampler {
    fn vertex_count(&self) -> usize { self.mesh.vertex_count() }

    fn sample(&mut self, clip: ClipId, time: f32, out: &mut SampledFrame) -> bool {
        let Some(clip) = self.clips.get(clip.0 as usize) else { return false };

        self.pose.clear();
        self.pose.extend(self.skeleton.bones.iter().map(|b| b.rest));
        clip.sample_into(time, &mut self.pose);

        self.skeleton.global_matrices_into(&self.pose, &mut self.globals);
        self.joints.clear();
        for (global, bone) in self.globals.iter().zip(&self.skeleton.bones) {
            self.joints.push(self.root * *global * bone.inverse_bind);
        }

        self.mesh.skin_into(&self.joints, out);
        true
    }
}
