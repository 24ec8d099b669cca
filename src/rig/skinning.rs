// src/rig/skinning.rs
//! Linear blend skinning of a rest mesh by joint matrices.

use bevy::prelude::*;

use super::SampledFrame;

/// Rest-pose geometry plus up to four joint influences per vertex.
#[derive(Clone, Debug, Default)]
pub struct SkinnedMesh {
    pub positions: Vec<Vec3>,
    /// Empty when the source mesh carries no normals.
    pub normals: Vec<Vec3>,
    pub joints: Vec<[u16; 4]>,
    pub weights: Vec<[f32; 4]>,
}

impl SkinnedMesh {
    /// Every vertex fully bound to `bone`.
    pub fn rigid(positions: Vec<Vec3>, normals: Vec<Vec3>, bone: u16) -> Self {
        let n = positions.len();
        Self {
            positions,
            normals,
            joints: vec![[bone, 0, 0, 0]; n],
            weights: vec![[1.0, 0.0, 0.0, 0.0]; n],
        }
    }

    pub fn vertex_count(&self) -> usize { self.positions.len() }

    pub fn has_normals(&self) -> bool {
        !self.normals.is_empty() && self.normals.len() == self.positions.len()
    }

    /// Skin every vertex into `out`. Influences that point past `joint_matrices`
    /// are ignored; a vertex without usable weight keeps its rest position.
    pub fn skin_into(&self, joint_matrices: &[Mat4], out: &mut SampledFrame) {
        out.positions.clear();
        out.normals.clear();
        let with_normals = self.has_normals();

        for (v, rest) in self.positions.iter().enumerate() {
            let joints = self.joints.get(v).copied().unwrap_or_default();
            let weights = self.weights.get(v).copied().unwrap_or_default();

            let mut skin = Mat4::ZERO;
            let mut total = 0.0;
            for (j, w) in joints.iter().zip(weights) {
                if w <= 0.0 { continue; }
                let Some(m) = joint_matrices.get(*j as usize) else { continue };
                skin += *m * w;
                total += w;
            }
            if total <= f32::EPSILON {
                skin = Mat4::IDENTITY;
            } else if (total - 1.0).abs() > 1e-4 {
                skin *= 1.0 / total;
            }

            out.positions.push(skin.transform_point3(*rest));
            if with_normals {
                out.normals.push(skin.transform_vector3(self.normals[v]).normalize_or_zero());
            }
        }
    }
}
