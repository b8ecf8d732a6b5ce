//! Integration tests for the cook pipeline: dirty tracking, caching, failure
//! handling and full-resync decisions.

use std::sync::Arc;

use houdini_asset_node::cook::{CookOrchestrator, ParmId, Resync, ResyncReason};
use houdini_asset_node::engine::memory::{AssetDefinition, MemoryEngine, MemoryGeo, MemoryObject, MemoryPart};
use houdini_asset_node::engine::{GeoId, ObjectId, ParmValue, PartId};
use houdini_asset_node::part::PartKey;
use houdini_asset_node::util::{Error, Vec3};
use houdini_asset_node::AssetNodeOptions;

const LIBRARY: &str = "assets/quad.hda";
const ASSET: &str = "quad";

fn quad_part() -> MemoryPart {
    MemoryPart::mesh(
        "quad",
        &[Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y],
        vec![3, 3],
        vec![0, 1, 2, 0, 2, 3],
    )
}

fn quad_engine() -> MemoryEngine {
    let engine = MemoryEngine::new();
    engine.define_asset(
        LIBRARY,
        ASSET,
        AssetDefinition::new()
            .with_parm("size", ParmValue::Float(vec![1.0]))
            .with_parm("seed", ParmValue::Int(vec![0]))
            .with_object(MemoryObject::new("obj").with_geo(MemoryGeo::new("geo").with_part(quad_part()))),
    );
    engine
}

fn loaded(engine: &MemoryEngine) -> CookOrchestrator<MemoryEngine> {
    let mut cook = CookOrchestrator::new(engine.clone());
    cook.load_asset(LIBRARY, ASSET).expect("Failed to load asset");
    cook
}

/// Key of the first part of the first geometry of the first object.
fn first_part(cook: &CookOrchestrator<MemoryEngine>) -> PartKey {
    let asset = cook.asset().expect("No asset loaded").id;
    let object = ObjectId(asset.0 * 1000);
    PartKey::new(object, GeoId(object.0 * 100), PartId(0))
}

#[test]
fn test_end_to_end_quad() {
    let engine = quad_engine();
    let mut cook = loaded(&engine);

    let first = cook.request_recompute(false).expect("First cook failed");
    assert_eq!(first.objects.len(), 1);
    let geos = first.objects[0].geometries().expect("Object should carry geometry");
    assert_eq!(geos.len(), 1);
    assert_eq!(geos[0].parts.len(), 1);
    let mesh = geos[0].parts[0].data.as_mesh().expect("Part should be a mesh");
    assert_eq!(mesh.positions.len(), 4);
    assert_eq!(mesh.face_indices.len(), 6);
    assert_eq!(mesh.face_counts, vec![3, 3]);

    cook.mark_parameter_dirty(&ParmId::from_path("size")).expect("Unknown parameter");
    let second = cook.request_recompute(false).expect("Second cook failed");
    assert_eq!(second.generation, first.generation + 1);
    assert_eq!(second.objects, first.objects);

    let state = cook.part_state(&first_part(&cook)).expect("Part should be cached");
    assert!(!state.never_built);
    assert_eq!(cook.last_pass().expect("No pass stats").resync, Resync::Incremental);
}

#[test]
fn test_recompute_is_idempotent() {
    let engine = quad_engine();
    let mut cook = loaded(&engine);
    let first = cook.request_recompute(false).expect("Cook failed");
    let before = engine.stats();

    let again = cook.request_recompute(false).expect("Recompute failed");
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(engine.stats(), before);
    assert_eq!(again.generation, first.generation);
}

#[test]
fn test_dirty_parameter_is_pushed_once() {
    let engine = quad_engine();
    let mut cook = loaded(&engine);
    cook.request_recompute(false).expect("Cook failed");

    let size = ParmId::from_path("size");
    cook.set_parameter(&size, ParmValue::Float(vec![2.0])).expect("Set failed");
    cook.mark_parameter_dirty(&size).expect("Mark failed");
    assert_eq!(cook.dirty_parameters().len(), 1);

    let sets = engine.stats().parm_sets;
    cook.request_recompute(false).expect("Cook failed");
    assert_eq!(engine.stats().parm_sets, sets + 1);
    assert!(cook.dirty_parameters().is_empty());
    assert_eq!(cook.parameter(&size), Some(&ParmValue::Float(vec![2.0])));
}

#[test]
fn test_stale_result_survives_cook_failure() {
    let engine = quad_engine();
    let mut cook = loaded(&engine);
    let good = cook.request_recompute(false).expect("Cook failed");

    engine.fail_next_cook("node errors in /obj/geo");
    cook.mark_parameter_dirty(&ParmId::from_path("seed")).expect("Mark failed");
    match cook.request_recompute(false) {
        Err(Error::CookFailed(reason)) => assert!(reason.contains("node errors")),
        other => panic!("Expected CookFailed, got {other:?}"),
    }
    let kept = cook.last_result().expect("Previous result should be kept");
    assert!(Arc::ptr_eq(&good, &kept));

    let recovered = cook.request_recompute(true).expect("Recovery cook failed");
    assert_eq!(recovered.objects, good.objects);
    assert!(recovered.generation > good.generation);
}

#[test]
fn test_destroyed_asset_is_invalid() {
    let engine = quad_engine();
    let mut cook = loaded(&engine);
    let good = cook.request_recompute(false).expect("Cook failed");

    engine.kill_asset(cook.asset().expect("No asset").id);
    assert!(matches!(cook.request_recompute(true), Err(Error::AssetInvalid)));
    assert!(Arc::ptr_eq(&good, &cook.last_result().expect("Result should be kept")));
}

#[test]
fn test_shape_change_rebuilds_everything() {
    let engine = quad_engine();
    let mut cook = loaded(&engine);
    cook.request_recompute(false).expect("Cook failed");

    engine.edit_asset(LIBRARY, ASSET, |def| {
        def.objects[0].geos[0].parts[0] = MemoryPart::mesh(
            "quad",
            &[Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y, Vec3::new(0.5, 2.0, 0.0)],
            vec![3, 3, 3],
            vec![0, 1, 2, 0, 2, 3, 3, 2, 4],
        );
    });
    cook.mark_parameter_dirty(&ParmId::from_path("size")).expect("Mark failed");
    let changed = cook.request_recompute(false).expect("Cook failed");

    let stats = *cook.last_pass().expect("No pass stats");
    assert_eq!(stats.resync, Resync::Full(ResyncReason::ShapeChanged));
    assert_eq!(stats.full_rebuilds, 1);
    assert_eq!(stats.refilled + stats.reused, 0);
    assert!(stats.needs_output_sync);

    let mut fresh = loaded(&engine);
    let expected = fresh.request_recompute(false).expect("Fresh cook failed");
    assert_eq!(changed.objects, expected.objects);
}

#[test]
fn test_incremental_and_full_paths_agree() {
    let engine = quad_engine();
    let mut incremental = loaded(&engine);
    incremental.request_recompute(false).expect("Cook failed");
    incremental.set_parameter(&ParmId::from_path("size"), ParmValue::Float(vec![3.0])).expect("Set failed");
    let refilled = incremental.request_recompute(false).expect("Cook failed");
    assert_eq!(incremental.last_pass().expect("No pass stats").refilled, 1);

    let mut full = loaded(&engine);
    full.request_recompute(false).expect("Cook failed");
    full.set_parameter(&ParmId::from_path("size"), ParmValue::Float(vec![3.0])).expect("Set failed");
    let rebuilt = full.request_recompute(true).expect("Cook failed");
    assert_eq!(full.last_pass().expect("No pass stats").full_rebuilds, 1);

    assert_eq!(refilled.objects, rebuilt.objects);
}

#[test]
fn test_locked_asset_serves_cache() {
    let engine = quad_engine();
    let mut cook = loaded(&engine);
    let first = cook.request_recompute(false).expect("Cook failed");

    cook.set_options(AssetNodeOptions { lock_asset: true, ..Default::default() });
    cook.set_parameter(&ParmId::from_path("size"), ParmValue::Float(vec![5.0])).expect("Set failed");
    let before = engine.stats();
    let locked = cook.request_recompute(true).expect("Locked recompute failed");
    assert!(Arc::ptr_eq(&first, &locked));
    assert_eq!(engine.stats(), before);
    assert_eq!(cook.dirty_parameters().len(), 1);

    cook.set_options(AssetNodeOptions::default());
    cook.request_recompute(false).expect("Cook failed");
    assert_eq!(engine.stats().parm_sets, before.parm_sets + 1);
}

#[test]
fn test_locked_asset_cooks_once_without_cache() {
    let engine = quad_engine();
    let mut cook = CookOrchestrator::with_options(engine.clone(), AssetNodeOptions { lock_asset: true, ..Default::default() });
    cook.load_asset(LIBRARY, ASSET).expect("Failed to load asset");
    let result = cook.request_recompute(false).expect("Cook failed");
    assert_eq!(result.objects.len(), 1);
    assert_eq!(engine.stats().cooks, 1);
}

#[test]
fn test_time_is_pushed_only_when_changed() {
    let engine = quad_engine();
    let mut cook = loaded(&engine);
    cook.request_recompute(false).expect("Cook failed");
    let sets = engine.stats().time_sets;

    cook.set_time(0.0);
    cook.request_recompute(false).expect("Cook failed");
    assert_eq!(engine.stats().time_sets, sets);

    cook.set_time(2.5);
    assert!(cook.is_dirty());
    cook.request_recompute(false).expect("Cook failed");
    assert_eq!(engine.stats().time_sets, sets + 1);
    assert_eq!(engine.time(), 2.5);
}

#[test]
fn test_parameters_are_pulled_after_cook() {
    let engine = quad_engine();
    let mut cook = loaded(&engine);
    let seed = ParmId::from_path("seed");
    assert_eq!(cook.parameter(&seed), Some(&ParmValue::Int(vec![0])));
    assert_eq!(cook.parameters().len(), 2);

    // A second handle on the same asset edits the parameter behind the node's back.
    let mut other = engine.clone();
    let asset = cook.asset().expect("No asset").id;
    houdini_asset_node::engine::Engine::set_parm_value(&mut other, asset, "seed", &ParmValue::Int(vec![9]))
        .expect("Set failed");

    cook.request_recompute(false).expect("Cook failed");
    assert_eq!(cook.parameter(&seed), Some(&ParmValue::Int(vec![9])));
}
