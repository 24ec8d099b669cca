// src/playback/systems.rs

use bevy::prelude::*;

use super::components::{AnimatedEntities, PlayAnimation, ResetAnimation, SetPlaybackSpeed, VertexAnimated};
use super::draw::VatDrawQueue;
use super::runtime::VatRuntime;
use crate::asset::BakedAnimationAsset;

/// Register new `VertexAnimated` entities whose asset has finished loading.
pub fn register_vertex_animated(
    time: Res<Time>,
    mut runtime: ResMut<VatRuntime>,
    mut entities: ResMut<AnimatedEntities>,
    assets: Res<Assets<BakedAnimationAsset>>,
    q: Query<(Entity, &VertexAnimated, &GlobalTransform)>,
) {
    runtime.set_time(time.elapsed_secs());
    for (e, anim, gt) in q.iter() {
        if entities.by_entity.contains_key(&e) { continue; }
        if !assets.contains(&anim.asset) { continue; }

        let id = runtime.spawn(anim.asset.id(), gt.compute_transform());
        if !runtime.register(id, &assets) {
            runtime.despawn(id);
            continue;
        }
        if let Some(name) = anim.start_entry.as_deref() {
            runtime.play(id, name, &assets);
        }
        entities.by_entity.insert(e, id);
    }
}

/// `VertexAnimated` re-inserted with another asset -> drop the old instance so
/// the entity registers again against the new one.
pub fn reregister_changed_assets(
    mut runtime: ResMut<VatRuntime>,
    mut entities: ResMut<AnimatedEntities>,
    q: Query<(Entity, &VertexAnimated), Changed<VertexAnimated>>,
) {
    for (e, anim) in q.iter() {
        let Some(id) = entities.get(e) else { continue };
        if runtime.instance(id).is_some_and(|i| i.asset == anim.asset.id()) { continue; }

        entities.by_entity.remove(&e);
        runtime.despawn(id);
        debug!("VAT: {:?} switched asset, re-registering", e);
    }
}

/// Component removed or entity despawned -> drop the instance.
pub fn unregister_removed(
    mut removed: RemovedComponents<VertexAnimated>,
    mut runtime: ResMut<VatRuntime>,
    mut entities: ResMut<AnimatedEntities>,
) {
    for e in removed.read() {
        if let Some(id) = entities.by_entity.remove(&e) {
            runtime.despawn(id);
        }
    }
}

pub fn sync_transforms(
    mut runtime: ResMut<VatRuntime>,
    entities: Res<AnimatedEntities>,
    q: Query<(Entity, &GlobalTransform), (With<VertexAnimated>, Changed<GlobalTransform>)>,
) {
    for (e, gt) in q.iter() {
        let Some(id) = entities.get(e) else { continue };
        runtime.set_transform(id, gt.compute_transform());
    }
}

pub fn apply_playback_events(
    mut runtime: ResMut<VatRuntime>,
    entities: Res<AnimatedEntities>,
    assets: Res<Assets<BakedAnimationAsset>>,
    mut play: EventReader<PlayAnimation>,
    mut speed: EventReader<SetPlaybackSpeed>,
    mut reset: EventReader<ResetAnimation>,
) {
    for ev in play.read() {
        let Some(id) = entities.get(ev.entity) else { continue };
        if !runtime.play(id, &ev.name, &assets) {
            debug!("VAT: play '{}' on {:?} ignored", ev.name, ev.entity);
        }
    }
    for ev in speed.read() {
        if let Some(id) = entities.get(ev.entity) {
            runtime.set_speed(id, ev.speed);
        }
    }
    for ev in reset.read() {
        if let Some(id) = entities.get(ev.0) {
            runtime.reset(id);
        }
    }
}

/// Unloaded asset -> its batches go away; entities re-register on reload.
pub fn release_unloaded_assets(
    mut events: EventReader<AssetEvent<BakedAnimationAsset>>,
    mut runtime: ResMut<VatRuntime>,
    mut entities: ResMut<AnimatedEntities>,
) {
    for ev in events.read() {
        let AssetEvent::Removed { id } = ev else { continue };
        let released = runtime.release_asset(*id);

        let stale: Vec<Entity> = entities
            .by_entity
            .iter()
            .filter(|(_, inst)| runtime.instance(**inst).is_some_and(|i| i.asset == *id))
            .map(|(e, _)| *e)
            .collect();
        for e in stale {
            if let Some(inst) = entities.by_entity.remove(&e) {
                runtime.despawn(inst);
            }
        }
        info!("VAT: asset {:?} unloaded, {} instances released", id, released);
    }
}

/// The frame driver: update + draw every batch in registration order.
pub fn drive_batches(
    time: Res<Time>,
    mut runtime: ResMut<VatRuntime>,
    assets: Res<Assets<BakedAnimationAsset>>,
    mut queue: ResMut<VatDrawQueue>,
) {
    queue.clear();
    runtime.tick(time.elapsed_secs(), &assets, &mut *queue);
}
