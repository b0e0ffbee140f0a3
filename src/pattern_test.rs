use super::*;
use crate::config::BrushConfig;
use crate::geom::Point;
use crate::path::{Intent, synthesize};
use crate::scene::ObjectId;

fn alpha(snapshot: &PatternSnapshot, x: u32, y: u32) -> u8 {
    snapshot.pixmap().unwrap().pixel(x, y).unwrap().alpha()
}

/// Erasable rect on the left half, protected rect on the right half.
fn split_scene() -> (Scene, ObjectId, ObjectId) {
    let mut scene = Scene::new(100.0, 50.0);
    let erasable = scene.add(SceneObject::rect(0.0, 0.0, 50.0, 50.0));
    let locked = scene.add(SceneObject::rect(50.0, 0.0, 50.0, 50.0).with_erasable(Erasability::No));
    (scene, erasable, locked)
}

fn erase_across(scene: &mut Scene, id: &ObjectId) {
    let path = synthesize(&[Point::new(-25.0, 0.0), Point::new(25.0, 0.0)], &BrushConfig::default(), Intent::Erase)
        .unwrap();
    scene.get_mut(id).unwrap().ensure_eraser().push(path);
}

// =============================================================
// Normal mode
// =============================================================

#[test]
fn capture_keeps_only_protected_objects() {
    let (mut scene, _, _) = split_scene();
    let snapshot = PatternSnapshot::capture(&mut scene, false).unwrap();
    assert_eq!(alpha(&snapshot, 25, 25), 0);
    assert_eq!(alpha(&snapshot, 75, 25), 255);
}

#[test]
fn capture_restores_visibility_and_marks_dirty() {
    let (mut scene, erasable, locked) = split_scene();
    PatternSnapshot::capture(&mut scene, false).unwrap();
    let obj = scene.get(&erasable).unwrap();
    assert!(obj.visible);
    assert!(obj.dirty);
    assert!(!scene.get(&locked).unwrap().dirty);
}

#[test]
fn render_step_sees_filtered_scene() {
    let (mut scene, erasable, locked) = split_scene();
    PatternSnapshot::capture_with(&mut scene, false, |_, filtered, inverted| {
        assert!(!inverted);
        assert!(!filtered.get(&erasable).unwrap().visible);
        assert!(filtered.get(&locked).unwrap().visible);
        Ok(())
    })
    .unwrap();
}

#[test]
fn failed_render_still_restores_scene() {
    let (mut scene, erasable, _) = split_scene();
    erase_across(&mut scene, &erasable);

    let result = PatternSnapshot::capture_with(&mut scene, true, |_, filtered, _| {
        assert!(filtered.get(&erasable).unwrap().eraser.as_ref().unwrap().is_inverted());
        Err(EraseError::Render("boom".into()))
    });
    assert!(matches!(result, Err(EraseError::Render(_))));
    assert!(!scene.get(&erasable).unwrap().eraser.as_ref().unwrap().is_inverted());

    let result = PatternSnapshot::capture_with(&mut scene, false, |_, _, _| Err(EraseError::Render("boom".into())));
    assert!(result.is_err());
    assert!(scene.get(&erasable).unwrap().visible);
}

#[test]
fn hidden_objects_are_not_unhidden() {
    let (mut scene, erasable, _) = split_scene();
    scene.get_mut(&erasable).unwrap().visible = false;
    PatternSnapshot::capture(&mut scene, false).unwrap();
    assert!(!scene.get(&erasable).unwrap().visible);
}

#[test]
fn objects_sharing_an_id_are_all_restored() {
    let mut scene = Scene::new(100.0, 100.0);
    let obj = SceneObject::rect(0.0, 0.0, 20.0, 20.0);
    scene.add(obj.clone());
    scene.add(obj.at(70.0, 70.0));

    PatternSnapshot::capture(&mut scene, false).unwrap();
    assert!(scene.objects().iter().all(|o| o.visible && o.dirty));
}

#[test]
fn objects_sharing_an_id_are_all_uninverted() {
    let mut scene = Scene::new(100.0, 100.0);
    let mut obj = SceneObject::rect(0.0, 0.0, 20.0, 20.0);
    let path = synthesize(&[Point::new(-5.0, 0.0), Point::new(5.0, 0.0)], &BrushConfig::default(), Intent::Erase)
        .unwrap();
    obj.ensure_eraser().push(path);
    scene.add(obj.clone());
    scene.add(obj.at(70.0, 70.0));

    let result = PatternSnapshot::capture_with(&mut scene, true, |_, filtered, _| {
        assert!(filtered.objects().iter().all(|o| o.eraser.as_ref().unwrap().is_inverted()));
        Err(EraseError::Render("boom".into()))
    });
    assert!(result.is_err());
    assert!(scene.objects().iter().all(|o| !o.eraser.as_ref().unwrap().is_inverted()));
}

#[test]
fn background_color_is_protected() {
    let (mut scene, _, _) = split_scene();
    scene.background_color = Some("#ffffff".into());
    let snapshot = PatternSnapshot::capture(&mut scene, false).unwrap();
    assert_eq!(alpha(&snapshot, 25, 25), 255);
}

#[test]
fn erasable_background_image_is_left_out() {
    let mut scene = Scene::new(40.0, 40.0);
    scene.background_image = Some(SceneObject::rect(0.0, 0.0, 40.0, 40.0));
    let snapshot = PatternSnapshot::capture(&mut scene, false).unwrap();
    assert_eq!(alpha(&snapshot, 20, 20), 0);

    scene.background_image = Some(SceneObject::rect(0.0, 0.0, 40.0, 40.0).with_erasable(Erasability::No));
    let snapshot = PatternSnapshot::capture(&mut scene, false).unwrap();
    assert_eq!(alpha(&snapshot, 20, 20), 255);
}

#[test]
fn protected_overlay_is_included_outside_inverted_mode() {
    let mut scene = Scene::new(40.0, 40.0);
    scene.overlay_image = Some(SceneObject::rect(0.0, 0.0, 40.0, 40.0).with_erasable(Erasability::No));
    assert_eq!(alpha(&PatternSnapshot::capture(&mut scene, false).unwrap(), 20, 20), 255);
    assert_eq!(alpha(&PatternSnapshot::capture(&mut scene, true).unwrap(), 20, 20), 0);
}

#[test]
fn deep_container_hides_only_erasable_children() {
    let mut scene = Scene::new(100.0, 50.0);
    let soft = SceneObject::rect(0.0, 0.0, 50.0, 50.0);
    let soft_id = soft.id;
    let hard = SceneObject::rect(50.0, 0.0, 50.0, 50.0).with_erasable(Erasability::No);
    let group = scene.add(SceneObject::container(0.0, 0.0, vec![soft, hard]).with_erasable(Erasability::Deep));

    let snapshot = PatternSnapshot::capture(&mut scene, false).unwrap();
    assert_eq!(alpha(&snapshot, 25, 25), 0);
    assert_eq!(alpha(&snapshot, 75, 25), 255);
    assert!(scene.get(&soft_id).unwrap().visible);
    assert!(scene.get(&soft_id).unwrap().dirty);
    assert!(scene.get(&group).unwrap().dirty);
}

// =============================================================
// Inverted mode
// =============================================================

#[test]
fn inverted_capture_shows_only_erased_regions() {
    let (mut scene, erasable, _) = split_scene();
    scene.background_color = Some("#ffffff".into());
    erase_across(&mut scene, &erasable);

    let snapshot = PatternSnapshot::capture(&mut scene, true).unwrap();
    // Erased band through the middle of the left rect.
    assert_eq!(alpha(&snapshot, 25, 25), 255);
    assert_eq!(alpha(&snapshot, 25, 5), 0);
    // Protected content stays.
    assert_eq!(alpha(&snapshot, 75, 5), 255);
}

#[test]
fn inverted_capture_hides_erasable_objects_without_mask() {
    let (mut scene, erasable, _) = split_scene();
    let snapshot = PatternSnapshot::capture(&mut scene, true).unwrap();
    assert_eq!(alpha(&snapshot, 25, 25), 0);
    assert!(scene.get(&erasable).unwrap().visible);
}

// =============================================================
// Degenerate
// =============================================================

#[test]
fn zero_sized_canvas_gives_empty_snapshot() {
    let mut scene = Scene::new(0.0, 10.0);
    let snapshot = PatternSnapshot::capture(&mut scene, false).unwrap();
    assert!(snapshot.is_empty());
    assert!(snapshot.pixmap().is_none());
}
