use bevy::prelude::*;
use std::f32::consts::FRAC_PI_2;

use vat_instancing::asset::material::{self, MaterialParams, ParamValue};
use vat_instancing::clip::{GraphLayer, Motion, StateGraph};
use vat_instancing::playback::{PlayAnimation, ResetAnimation, SetPlaybackSpeed, VatDrawQueue};
use vat_instancing::rig::{AnimationClip, BoneTrack, Keyframe, SkinnedMesh, SkinnedRig};
use vat_instancing::{
    bake, create_baked_asset, BakeSelection, BakeSettings, BakedAnimationAsset, VatPlaybackConfig, VatPlugin,
    VatRuntime, VertexAnimated,
};

/// Three-vertex crate on one bone: "Bob" (loop) is the default state, "Spin"
/// a one-shot, "Broken" has no motion at all.
fn crate_rig() -> SkinnedRig {
    let mut rig = SkinnedRig::new("Crate");
    let root = rig.skeleton.push("root", None, Transform::IDENTITY);
    rig.mesh = Some(SkinnedMesh::rigid(
        vec![Vec3::ZERO, Vec3::X, Vec3::Y],
        vec![Vec3::Z; 3],
        root as u16,
    ));

    let spin = rig.add_clip(AnimationClip::new("Spin", 0.5, 20.0, false).with_track(
        BoneTrack::new(root).with_rotation(vec![
            Keyframe::new(0.0, Quat::IDENTITY),
            Keyframe::new(0.5, Quat::from_rotation_y(FRAC_PI_2)),
        ]),
    ));
    let bob = rig.add_clip(AnimationClip::new("Bob", 1.0, 10.0, true).with_track(
        BoneTrack::new(root).with_translation(vec![
            Keyframe::new(0.0, Vec3::ZERO),
            Keyframe::new(0.5, Vec3::Y * 0.5),
            Keyframe::new(1.0, Vec3::ZERO),
        ]),
    ));

    let mut layer = GraphLayer::default();
    layer.add_state("Spin", Motion::Clip(spin));
    layer.default_state = Some(layer.add_state("Bob", Motion::Clip(bob)));
    layer.add_state("Broken", Motion::Empty);
    rig.graph = Some(StateGraph { layers: vec![layer] });
    rig
}

fn export_crate(dir: &std::path::Path) -> BakedAnimationAsset {
    export_crate_as(dir, "Crate", "materials/vat_crate")
}

fn export_crate_as(dir: &std::path::Path, name: &str, material: &str) -> BakedAnimationAsset {
    let rig = crate_rig();
    let selection = BakeSelection::from_source(&rig);
    let settings = BakeSettings {
        output_name: name.into(),
        output_folder: dir.to_path_buf(),
        mesh: "models/crate.glb#Mesh0".into(),
        material: Some(material.into()),
        ..Default::default()
    };
    let created = create_baked_asset(&rig, &selection, &settings).unwrap();
    let bytes = std::fs::read(&created.record_path).unwrap();
    BakedAnimationAsset::from_ron_bytes(&bytes).unwrap()
}

#[test]
fn default_state_bakes_first_and_broken_state_is_skipped() {
    let rig = crate_rig();
    let selection = BakeSelection::from_source(&rig);
    let broken = selection.state("Broken").unwrap();
    assert!(!broken.selected);
    assert!(broken.descriptor.non_bakeable_reason().is_some());

    let out = bake(&rig, &selection).unwrap();
    let names: Vec<_> = out.entries.iter().map(|e| (e.name.as_str(), e.start_row)).collect();
    assert_eq!(names, [("Bob", 0), ("Spin", 5)]);
    assert_eq!((out.position.width(), out.position.height()), (3, 10));
}

#[test]
fn exported_record_drives_material_and_playback() {
    let tmp = tempfile::tempdir().unwrap();
    let asset = export_crate(tmp.path());
    assert_eq!(asset.position_texture(), "vat/Crate_Positions.png");

    let params = MaterialParams::from_asset(&asset);
    assert_eq!(params.get(material::START_ROW), Some(&ParamValue::FloatArray(vec![0.0, 5.0])));
    assert_eq!(params.get(material::VERTEX_COUNT), Some(&ParamValue::Float(3.0)));

    let mut assets = Assets::<BakedAnimationAsset>::default();
    let handle = assets.add(asset);
    let mut runtime = VatRuntime::new(VatPlaybackConfig {
        batch_capacity: 2,
        randomize_default_offset: false,
        ..Default::default()
    });

    let ids: Vec<_> = (0..3)
        .map(|i| {
            let id = runtime.spawn(handle.id(), Transform::from_xyz(i as f32 * 2.0, 0.0, 0.0));
            assert!(runtime.register(id, &assets));
            id
        })
        .collect();
    assert!(runtime.play(ids[1], "Spin", &assets));

    let mut queue = VatDrawQueue::default();
    assert_eq!(runtime.tick(2.0, &assets, &mut queue), 2);
    assert_eq!(queue.instance_total(), 3);
    assert_eq!(queue.draws[0].block.clip_index, vec![0.0, 1.0]);

    assert_eq!(runtime.normalized_progress(ids[1], &assets), Some(1.0));
    assert_eq!(runtime.normalized_progress(ids[0], &assets), Some(0.0));
}

#[test]
fn plugin_registers_entities_and_handles_events() {
    let tmp = tempfile::tempdir().unwrap();
    let asset = export_crate(tmp.path());

    let mut app = App::new();
    app.add_plugins((MinimalPlugins, AssetPlugin::default()))
        .insert_resource(VatPlaybackConfig { randomize_default_offset: false, ..Default::default() })
        .add_plugins(VatPlugin);

    let handle = app.world_mut().resource_mut::<Assets<BakedAnimationAsset>>().add(asset);
    let entity = app
        .world_mut()
        .spawn((
            VertexAnimated::new(handle.clone()),
            Transform::from_xyz(4.0, 0.0, 0.0),
            GlobalTransform::from_xyz(4.0, 0.0, 0.0),
        ))
        .id();
    app.update();

    let queue = app.world().resource::<VatDrawQueue>();
    assert_eq!(queue.draws.len(), 1);
    assert_eq!(queue.draws[0].transforms[0].w_axis.x, 4.0);
    assert_eq!(queue.draws[0].material, "materials/vat_crate");

    app.world_mut().send_event(PlayAnimation { entity, name: "Spin".into() });
    app.update();
    let queue = app.world().resource::<VatDrawQueue>();
    assert_eq!(queue.draws[0].block.clip_index[0], 1.0);

    app.world_mut().entity_mut(entity).remove::<VertexAnimated>();
    app.update();
    assert!(app.world().resource::<VatDrawQueue>().draws.is_empty());
    assert_eq!(app.world().resource::<VatRuntime>().instance_count(), 0);
}

fn playback_app() -> App {
    let mut app = App::new();
    app.add_plugins((MinimalPlugins, AssetPlugin::default()))
        .insert_resource(VatPlaybackConfig { randomize_default_offset: false, ..Default::default() })
        .add_plugins(VatPlugin);
    app
}

fn spawn_animated(app: &mut App, handle: Handle<BakedAnimationAsset>) -> Entity {
    app.world_mut()
        .spawn((VertexAnimated::new(handle), Transform::IDENTITY, GlobalTransform::IDENTITY))
        .id()
}

#[test]
fn speed_and_reset_events_reach_the_property_block() {
    let tmp = tempfile::tempdir().unwrap();
    let mut app = playback_app();
    let handle = app.world_mut().resource_mut::<Assets<BakedAnimationAsset>>().add(export_crate(tmp.path()));
    let entity = spawn_animated(&mut app, handle);
    app.update();
    assert_eq!(app.world().resource::<VatDrawQueue>().draws[0].block.speed[0], 1.0);

    app.world_mut().send_event(SetPlaybackSpeed { entity, speed: 2.0 });
    app.update();
    let block = &app.world().resource::<VatDrawQueue>().draws[0].block;
    assert_eq!(block.speed[0], 2.0);

    app.world_mut().send_event(ResetAnimation(entity));
    app.update();
    let now = app.world().resource::<VatRuntime>().now();
    let block = &app.world().resource::<VatDrawQueue>().draws[0].block;
    assert_eq!(block.offset[0], 0.0);
    assert_eq!(block.begin[0], now);
    assert_eq!(block.speed[0], 2.0);
}

#[test]
fn switching_asset_handle_moves_entity_to_new_batch() {
    let tmp = tempfile::tempdir().unwrap();
    let mut app = playback_app();
    let (a, b) = {
        let mut assets = app.world_mut().resource_mut::<Assets<BakedAnimationAsset>>();
        let a = assets.add(export_crate_as(tmp.path(), "CrateA", "mat_a"));
        let b = assets.add(export_crate_as(tmp.path(), "CrateB", "mat_b"));
        (a, b)
    };
    let entity = spawn_animated(&mut app, a);
    app.update();
    let queue = app.world().resource::<VatDrawQueue>();
    assert_eq!(queue.draws.len(), 1);
    assert_eq!(queue.draws[0].material, "mat_a");

    app.world_mut().entity_mut(entity).insert(VertexAnimated::new(b));
    app.update();
    let queue = app.world().resource::<VatDrawQueue>();
    assert_eq!(queue.draws.len(), 1);
    assert_eq!(queue.draws[0].material, "mat_b");
    assert_eq!(queue.instance_total(), 1);
    assert_eq!(app.world().resource::<VatRuntime>().instance_count(), 1);
}

#[test]
fn unloaded_asset_stops_drawing_until_reloaded() {
    let tmp = tempfile::tempdir().unwrap();
    let asset = export_crate(tmp.path());
    let mut app = playback_app();
    let handle = app.world_mut().resource_mut::<Assets<BakedAnimationAsset>>().add(asset.clone());
    spawn_animated(&mut app, handle.clone());
    app.update();
    assert_eq!(app.world().resource::<VatDrawQueue>().draws.len(), 1);

    app.world_mut().resource_mut::<Assets<BakedAnimationAsset>>().remove(handle.id());
    app.update();
    assert!(app.world().resource::<VatDrawQueue>().draws.is_empty());
    app.update();
    assert!(app.world().resource::<VatDrawQueue>().draws.is_empty());
    assert_eq!(app.world().resource::<VatRuntime>().instance_count(), 0);

    let _ = app.world_mut().resource_mut::<Assets<BakedAnimationAsset>>().insert(handle.id(), asset);
    app.update();
    app.update();
    let queue = app.world().resource::<VatDrawQueue>();
    assert_eq!(queue.draws.len(), 1);
    assert_eq!(queue.draws[0].material, "materials/vat_crate");
    assert_eq!(app.world().resource::<VatRuntime>().instance_count(), 1);
}
