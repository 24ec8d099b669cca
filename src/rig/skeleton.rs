// src/rig/skeleton.rs
//! Bone hierarchy and keyframed clips, evaluated on the CPU.

use bevy::prelude::*;

// ---------- Hierarchy ----------

#[derive(Clone, Debug)]
pub struct Bone {
    pub name: String,
    /// Parent index. Parents always precede their children.
    pub parent: Option<usize>,
    /// Local bind pose.
    pub rest: Transform,
    /// Inverse of the global bind matrix.
    pub inverse_bind: Mat4,
}

#[derive(Clone, Debug, Default)]
pub struct Skeleton {
    pub bones: Vec<Bone>,
}

impl Skeleton {
    /// Append a bone and derive its inverse bind matrix from the rest pose.
    /// A parent index that does not precede the new bone is dropped.
    pub fn push(&mut self, name: impl Into<String>, parent: Option<usize>, rest: Transform) -> usize {
        let index = self.bones.len();
        let parent = parent.filter(|&p| p < index);
        let parent_global = parent
            .map(|p| self.bones[p].inverse_bind.inverse())
            .unwrap_or(Mat4::IDENTITY);
        let global = parent_global * rest.compute_matrix();

        self.bones.push(Bone {
            name: name.into(),
            parent,
            rest,
            inverse_bind: global.inverse(),
        });
        index
    }

    pub fn len(&self) -> usize { self.bones.len() }
    pub fn is_empty(&self) -> bool { self.bones.is_empty() }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }

    pub fn rest_pose(&self) -> Vec<Transform> {
        self.bones.iter().map(|b| b.rest).collect()
    }

    /// Resolve local poses into global matrices (`out` is resized to fit).
    /// A parent that does not precede its child is treated as the root.
    pub fn global_matrices_into(&self, pose: &[Transform], out: &mut Vec<Mat4>) {
        out.clear();
        for (i, bone) in self.bones.iter().enumerate() {
            let local = pose.get(i).unwrap_or(&bone.rest).compute_matrix();
            let global = match bone.parent {
                Some(p) => out.get(p).copied().unwrap_or(Mat4::IDENTITY) * local,
                None => local,
            };
            out.push(global);
        }
    }
}

// ---------- Keyframes ----------

#[derive(Clone, Copy, Debug)]
pub struct Keyframe<T> {
    pub time: f32,
    pub value: T,
}

impl<T> Keyframe<T> {
    pub const fn new(time: f32, value: T) -> Self { Self { time, value } }
}

pub trait Interpolate: Copy {
    fn interpolate(a: Self, b: Self, t: f32) -> Self;
}

impl Interpolate for Vec3 {
    fn interpolate(a: Self, b: Self, t: f32) -> Self { a.lerp(b, t) }
}

impl Interpolate for Quat {
    fn interpolate(a: Self, b: Self, t: f32) -> Self { a.slerp(b, t) }
}

/// Sample a time-sorted key list, holding the end values outside its range.
pub fn sample_keys<T: Interpolate>(keys: &[Keyframe<T>], time: f32) -> Option<T> {
    let first = keys.first()?;
    let last = keys.last()?;
    if time <= first.time { return Some(first.value); }
    if time >= last.time { return Some(last.value); }

    let next = keys.partition_point(|k| k.time <= time);
    let a = &keys[next - 1];
    let b = &keys[next];
    let span = b.time - a.time;
    let t = if span > 0.0 { (time - a.time) / span } else { 0.0 };
    Some(T::interpolate(a.value, b.value, t))
}

// ---------- Clips ----------

/// Animation of a single bone. Empty channels leave the rest pose untouched.
#[derive(Clone, Debug, Default)]
pub struct BoneTrack {
    pub bone: usize,
    pub translation: Vec<Keyframe<Vec3>>,
    pub rotation: Vec<Keyframe<Quat>>,
    pub scale: Vec<Keyframe<Vec3>>,
}

impl BoneTrack {
    pub fn new(bone: usize) -> Self { Self { bone, ..Default::default() } }

    pub fn with_translation(mut self, keys: Vec<Keyframe<Vec3>>) -> Self {
        self.translation = keys;
        self
    }

    pub fn with_rotation(mut self, keys: Vec<Keyframe<Quat>>) -> Self {
        self.rotation = keys;
        self
    }

    pub fn with_scale(mut self, keys: Vec<Keyframe<Vec3>>) -> Self {
        self.scale = keys;
        self
    }
}

#[derive(Clone, Debug)]
pub struct AnimationClip {
    pub name: String,
    /// Seconds.
    pub duration: f32,
    /// Authored frames per second.
    pub sample_rate: f32,
    /// Authored loop flag; carried into the baked entry.
    pub looping: bool,
    pub tracks: Vec<BoneTrack>,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>, duration: f32, sample_rate: f32, looping: bool) -> Self {
        Self {
            name: name.into(),
            duration: duration.max(0.0),
            sample_rate: sample_rate.max(0.0),
            looping,
            tracks: Vec::new(),
        }
    }

    pub fn with_track(mut self, track: BoneTrack) -> Self {
        self.tracks.push(track);
        self
    }

    /// Frames the clip was authored with (`ceil(duration * sample_rate)`).
    pub fn native_frame_count(&self) -> u32 {
        (self.duration * self.sample_rate).ceil() as u32
    }

    /// Overwrite animated channels of `pose` with their values at `time`.
    pub fn sample_into(&self, time: f32, pose: &mut [Transform]) {
        let time = time.clamp(0.0, self.duration);
        for track in &self.tracks {
            let Some(tf) = pose.get_mut(track.bone) else { continue };
            if let Some(t) = sample_keys(&track.translation, time) { tf.translation = t; }
            if let Some(r) = sample_keys(&track.rotation, time) { tf.rotation = r; }
            if let Some(s) = sample_keys(&track.scale, time) { tf.scale = s; }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_interpolate_and_hold_ends() {
        let keys = vec![Keyframe::new(0.0, Vec3::ZERO), Keyframe::new(1.0, Vec3::X * 2.0)];
        assert_eq!(sample_keys(&keys, -1.0), Some(Vec3::ZERO));
        assert_eq!(sample_keys(&keys, 0.5), Some(Vec3::X));
        assert_eq!(sample_keys(&keys, 3.0), Some(Vec3::X * 2.0));
        assert_eq!(sample_keys::<Vec3>(&[], 0.5), None);
    }

    #[test]
    fn child_bind_matrix_inverts_global_rest() {
        let mut skel = Skeleton::default();
        let root = skel.push("root", None, Transform::from_xyz(0.0, 1.0, 0.0));
        let tip = skel.push("tip", Some(root), Transform::from_xyz(0.0, 2.0, 0.0));

        let mut globals = Vec::new();
        skel.global_matrices_into(&skel.rest_pose(), &mut globals);
        let skin = globals[tip] * skel.bones[tip].inverse_bind;
        assert!(skin.abs_diff_eq(Mat4::IDENTITY, 1e-5));
        assert!(globals[tip].transform_point3(Vec3::ZERO).abs_diff_eq(Vec3::Y * 3.0, 1e-5));
    }

    #[test]
    fn hand_built_forward_parent_acts_as_root() {
        let mut skel = Skeleton::default();
        skel.push("a", None, Transform::IDENTITY);
        skel.bones[0].parent = Some(1);
        skel.push("b", None, Transform::from_xyz(1.0, 0.0, 0.0));

        let mut globals = Vec::new();
        skel.global_matrices_into(&skel.rest_pose(), &mut globals);
        assert_eq!(globals.len(), 2);
        assert!(globals[0].abs_diff_eq(Mat4::IDENTITY, 1e-6));
    }

    #[test]
    fn native_frames_round_up() {
        let clip = AnimationClip::new("walk", 1.05, 30.0, true);
        assert_eq!(clip.native_frame_count(), 32);
    }
}
