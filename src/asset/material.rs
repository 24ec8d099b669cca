// src/asset/material.rs
//! Material parameters derived from a baked asset. Always re-derived from the
//! immutable asset; nothing here writes back into it.

use std::collections::BTreeMap;

use super::BakedAnimationAsset;

// Name-keyed parameter slots the playback shader reads.
pub const POSITION_TEXTURE: &str = "vat_position_tex";
pub const NORMAL_TEXTURE: &str = "vat_normal_tex";
pub const TEXTURE_WIDTH: &str = "vat_texture_width";
pub const TEXTURE_HEIGHT: &str = "vat_texture_height";
pub const VERTEX_COUNT: &str = "vat_vertex_count";
pub const BOUNDS_MIN: &str = "vat_bounds_min";
pub const BOUNDS_MAX: &str = "vat_bounds_max";
pub const START_ROW: &str = "vat_start_row";
pub const CLIP_LENGTH: &str = "vat_clip_length";
pub const FRAME_COUNT: &str = "vat_frame_count";
pub const IS_LOOP: &str = "vat_is_loop";

#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    Texture(String),
    Float(f32),
    Vec3([f32; 3]),
    FloatArray(Vec<f32>),
}

/// Receiver of name-keyed material parameters (a render material, a
/// property block, or a recorder).
pub trait MaterialBinder {
    fn set_param(&mut self, name: &'static str, value: ParamValue);
}

/// Plain recorder; also what tests and render backends can diff against.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MaterialParams {
    pub values: BTreeMap<&'static str, ParamValue>,
}

impl MaterialParams {
    pub fn from_asset(asset: &BakedAnimationAsset) -> Self {
        let mut params = Self::default();
        bind_material(asset, &mut params);
        params
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }
}

impl MaterialBinder for MaterialParams {
    fn set_param(&mut self, name: &'static str, value: ParamValue) {
        self.values.insert(name, value);
    }
}

/// Push every layout parameter of `asset` into `binder`. With more than one
/// playable entry the per-entry values go out as parallel arrays; otherwise
/// entry 0 is bound as scalars. Returns false for an asset without entries.
pub fn bind_material(asset: &BakedAnimationAsset, binder: &mut impl MaterialBinder) -> bool {
    if asset.entries().is_empty() {
        return false;
    }

    let size = asset.texture_size();
    let bounds = asset.bounds();
    binder.set_param(POSITION_TEXTURE, ParamValue::Texture(asset.position_texture().to_string()));
    binder.set_param(NORMAL_TEXTURE, ParamValue::Texture(asset.normal_texture().to_string()));
    binder.set_param(TEXTURE_WIDTH, ParamValue::Float(size.x as f32));
    binder.set_param(TEXTURE_HEIGHT, ParamValue::Float(size.y as f32));
    binder.set_param(VERTEX_COUNT, ParamValue::Float(asset.vertex_count() as f32));
    binder.set_param(BOUNDS_MIN, ParamValue::Vec3(bounds.min.to_array()));
    binder.set_param(BOUNDS_MAX, ParamValue::Vec3(bounds.max.to_array()));

    let available = &asset.entries()[..asset.available_count()];
    if asset.is_multi_clip() && available.len() > 1 {
        let column = |f: fn(&super::AnimationEntry) -> f32| {
            ParamValue::FloatArray(available.iter().map(f).collect())
        };
        binder.set_param(START_ROW, column(|e| e.start_row as f32));
        binder.set_param(CLIP_LENGTH, column(|e| e.length));
        binder.set_param(FRAME_COUNT, column(|e| e.bake_frame_count as f32));
        binder.set_param(IS_LOOP, column(|e| if e.is_loop { 1.0 } else { 0.0 }));
    } else {
        let e = &asset.entries()[0];
        binder.set_param(START_ROW, ParamValue::Float(e.start_row as f32));
        binder.set_param(CLIP_LENGTH, ParamValue::Float(e.length));
        binder.set_param(FRAME_COUNT, ParamValue::Float(e.bake_frame_count as f32));
        binder.set_param(IS_LOOP, ParamValue::Float(if e.is_loop { 1.0 } else { 0.0 }));
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::fixtures::soldier_asset;

    #[test]
    fn multi_clip_asset_binds_arrays_up_to_shader_slots() {
        let params = MaterialParams::from_asset(&soldier_asset(2));
        assert_eq!(params.get(START_ROW), Some(&ParamValue::FloatArray(vec![0.0, 10.0])));
        assert_eq!(params.get(IS_LOOP), Some(&ParamValue::FloatArray(vec![1.0, 0.0])));
        assert_eq!(params.get(TEXTURE_HEIGHT), Some(&ParamValue::Float(30.0)));
        assert_eq!(params.get(BOUNDS_MAX), Some(&ParamValue::Vec3([1.0, 2.0, 1.0])));
    }

    #[test]
    fn single_slot_shader_binds_first_entry_as_scalars() {
        let params = MaterialParams::from_asset(&soldier_asset(1));
        assert_eq!(params.get(CLIP_LENGTH), Some(&ParamValue::Float(2.0)));
        assert_eq!(params.get(FRAME_COUNT), Some(&ParamValue::Float(10.0)));
    }

    #[test]
    fn rebinding_is_idempotent() {
        let asset = soldier_asset(4);
        assert_eq!(MaterialParams::from_asset(&asset), MaterialParams::from_asset(&asset));
    }
}
