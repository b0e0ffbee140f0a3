//! End-to-end gestures driven through `EraserCore`, asserting on mask state
//! and rendered pixels.
#![allow(clippy::float_cmp)]

use eraser::config::{BrushConfig, BrushOptions};
use eraser::engine::{Action, EraserCore};
use eraser::geom::Point;
use eraser::input::Pointer;
use eraser::scene::{Erasability, Erasable, ObjectId, Scene, SceneObject};

// =============================================================
// Helpers
// =============================================================

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn gesture(core: &mut EraserCore, points: &[Point]) -> Vec<Action> {
    let Some((first, rest)) = points.split_first() else {
        return Vec::new();
    };
    core.on_pointer_down(*first, Pointer::primary());
    for p in rest {
        core.on_pointer_move(*p, Pointer::primary());
    }
    core.on_pointer_up(Pointer::primary())
}

fn pixel(core: &mut EraserCore, x: u32, y: u32) -> (u8, u8, u8, u8) {
    core.render().unwrap();
    let px = core.surfaces().unwrap().main.pixel(x, y).unwrap().demultiply();
    (px.red(), px.green(), px.blue(), px.alpha())
}

fn alpha(core: &mut EraserCore, x: u32, y: u32) -> u8 {
    pixel(core, x, y).3
}

fn mask_len(core: &EraserCore, id: &ObjectId) -> usize {
    core.scene.get(id).and_then(|o| o.eraser()).map_or(0, |m| m.len())
}

/// Rect spanning (0,0)-(100,100) on a canvas of the given size, erased along
/// its diagonal.
fn erased_square(width: f64, height: f64) -> (EraserCore, ObjectId) {
    let mut scene = Scene::new(width, height);
    let id = scene.add(SceneObject::rect(0.0, 0.0, 100.0, 100.0).with_fill("#ff0000"));
    let mut core = EraserCore::new(scene, BrushConfig::default());
    gesture(&mut core, &[pt(10.0, 10.0), pt(50.0, 50.0), pt(90.0, 90.0)]);
    (core, id)
}

// =============================================================
// Scenarios
// =============================================================

#[test]
fn simple_erase_cuts_diagonal_gap() {
    let (mut core, id) = erased_square(100.0, 100.0);

    assert_eq!(mask_len(&core, &id), 1);
    assert_eq!(alpha(&mut core, 50, 50), 0);
    assert_eq!(alpha(&mut core, 30, 30), 0);
    assert_eq!(alpha(&mut core, 80, 20), 255);
    assert_eq!(alpha(&mut core, 20, 80), 255);
}

#[test]
fn erased_region_travels_with_moves() {
    let (mut core, id) = erased_square(200.0, 100.0);
    core.scene.get_mut(&id).unwrap().x += 100.0;

    assert_eq!(alpha(&mut core, 150, 50), 0);
    assert_eq!(alpha(&mut core, 180, 20), 255);
    // The old location is empty canvas now.
    assert_eq!(alpha(&mut core, 50, 50), 0);
    assert_eq!(alpha(&mut core, 80, 20), 0);
}

#[test]
fn erased_region_travels_with_rotation() {
    let (mut core, id) = erased_square(100.0, 100.0);
    assert_eq!(alpha(&mut core, 70, 70), 0);

    core.scene.get_mut(&id).unwrap().rotation = 90.0;
    // Local (20, 20) now sits at center + (-20, 20).
    assert_eq!(alpha(&mut core, 30, 70), 0);
    assert_eq!(alpha(&mut core, 70, 70), 255);
}

#[test]
fn erased_region_and_width_scale_with_object() {
    let (mut core, id) = erased_square(200.0, 200.0);
    let obj = core.scene.get_mut(&id).unwrap();
    obj.x = 100.0;
    obj.y = 100.0;
    obj.scale_x = 2.0;
    obj.scale_y = 2.0;

    assert_eq!(alpha(&mut core, 150, 150), 0);
    assert_eq!(alpha(&mut core, 180, 40), 255);
    // Beyond the unscaled half width but inside the scaled one.
    assert_eq!(alpha(&mut core, 104, 96), 0);
}

#[test]
fn protected_background_survives_full_canvas_stroke() {
    let mut scene = Scene::new(100.0, 100.0);
    scene.background_color = Some("#ffffff".into());
    let id = scene.add(SceneObject::rect(0.0, 0.0, 100.0, 50.0).with_fill("#ff0000"));
    let mut core = EraserCore::new(scene, BrushConfig { width: 40.0, ..BrushConfig::default() });

    gesture(&mut core, &[pt(0.0, 25.0), pt(100.0, 25.0)]);

    assert_eq!(mask_len(&core, &id), 1);
    assert_eq!(pixel(&mut core, 50, 25), (255, 255, 255, 255));
    // Outside the stroke the rect is untouched.
    assert_eq!(pixel(&mut core, 50, 2), (255, 0, 0, 255));
}

#[test]
fn non_erasable_objects_never_get_masks() {
    let mut scene = Scene::new(100.0, 100.0);
    let locked = scene.add(SceneObject::rect(0.0, 0.0, 100.0, 100.0).with_fill("#0000ff").with_erasable(Erasability::No));
    let mut core = EraserCore::new(scene, BrushConfig::default());

    let actions = gesture(&mut core, &[pt(10.0, 50.0), pt(90.0, 50.0)]);

    assert!(core.scene.get(&locked).unwrap().eraser().is_none());
    assert!(!actions.iter().any(|a| matches!(a, Action::EraseApplied { .. })));
    assert_eq!(pixel(&mut core, 50, 50), (0, 0, 255, 255));
}

#[test]
fn empty_gesture_reports_nothing() {
    let (mut core, id) = erased_square(100.0, 100.0);
    core.on_pointer_down(pt(70.0, 20.0), Pointer::primary());
    let actions = core.on_pointer_up(Pointer::primary());

    assert!(matches!(
        actions.first(),
        Some(Action::ErasingEnded { path: None, targets, .. }) if targets.is_empty()
    ));
    assert!(!actions.iter().any(|a| matches!(a, Action::PathCreated(_))));
    assert_eq!(mask_len(&core, &id), 1);
}

#[test]
fn inverted_stroke_restores_erased_region() {
    let (mut core, id) = erased_square(100.0, 100.0);
    assert_eq!(alpha(&mut core, 50, 50), 0);

    core.update_brush(&BrushOptions { inverted: Some(true), width: Some(20.0), ..BrushOptions::default() }).unwrap();
    gesture(&mut core, &[pt(40.0, 40.0), pt(60.0, 60.0)]);

    assert_eq!(mask_len(&core, &id), 2);
    assert_eq!(alpha(&mut core, 50, 50), 255);
    // Outside the restore stroke the erase still holds.
    assert_eq!(alpha(&mut core, 20, 20), 0);
}

#[test]
fn deep_container_erases_only_erasable_children() {
    let soft = SceneObject::rect(0.0, 0.0, 50.0, 100.0).with_fill("#ff0000");
    let hard = SceneObject::rect(50.0, 0.0, 50.0, 100.0).with_fill("#0000ff").with_erasable(Erasability::No);
    let (soft_id, hard_id) = (soft.id, hard.id);
    let mut scene = Scene::new(100.0, 100.0);
    let group = scene.add(SceneObject::container(0.0, 0.0, vec![soft, hard]).with_erasable(Erasability::Deep));
    let mut core = EraserCore::new(scene, BrushConfig::default());

    let actions = gesture(&mut core, &[pt(10.0, 50.0), pt(90.0, 50.0)]);

    assert_eq!(mask_len(&core, &soft_id), 1);
    assert_eq!(mask_len(&core, &hard_id), 0);
    assert_eq!(mask_len(&core, &group), 0);
    assert!(matches!(
        actions.iter().find(|a| matches!(a, Action::ErasingEnded { .. })),
        Some(Action::ErasingEnded { targets, .. }) if targets == &vec![soft_id]
    ));
    assert_eq!(alpha(&mut core, 25, 50), 0);
    assert_eq!(pixel(&mut core, 75, 50), (0, 0, 255, 255));
}

#[test]
fn serialized_scene_renders_identically() {
    let (mut core, _) = erased_square(100.0, 100.0);
    let json = serde_json::to_string(&core.scene).unwrap();
    let scene: Scene = serde_json::from_str(&json).unwrap();
    assert_eq!(serde_json::to_string(&scene).unwrap(), json);

    let mut restored = EraserCore::new(scene, BrushConfig::default());
    core.render().unwrap();
    restored.render().unwrap();
    assert_eq!(core.surfaces().unwrap().main.data(), restored.surfaces().unwrap().main.data());
}
