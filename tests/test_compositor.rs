mod common;

use common::{overlay_object, solid_image};
use restage::compositor::SceneCompositor;
use restage::overlay::OverlayStore;

#[test]
fn empty_scene_at_ratio_one_is_the_base_image() {
    let base = solid_image(100, 100, [40, 80, 120, 255]);
    let mut store = OverlayStore::new();
    let generation = store.reset();
    // Detector found nothing.
    assert!(store.populate(generation, vec![]));

    let flattened = SceneCompositor::new(1).composite(&base, &store);
    assert_eq!(flattened, base.to_rgba8());
}

#[test]
fn compositing_an_unmutated_scene_twice_is_pixel_identical() {
    let base = solid_image(100, 100, [200, 200, 200, 255]);
    let mut store = OverlayStore::new();
    let generation = store.reset();
    let object = overlay_object(20.0, 20.0, 40, 40);
    let id = object.id;
    store.populate(generation, vec![object]);
    store.move_object(id, 50.0, 30.0).unwrap();

    let compositor = SceneCompositor::default();
    let first = compositor.composite(&base, &store);
    let second = compositor.composite(&base, &store);
    assert_eq!(first, second);
}

#[test]
fn composite_is_a_snapshot_unaffected_by_later_mutations() {
    let base = solid_image(100, 100, [0, 0, 0, 255]);
    let mut store = OverlayStore::new();
    let generation = store.reset();
    let object = overlay_object(20.0, 20.0, 40, 40);
    let id = object.id;
    store.populate(generation, vec![object]);

    let compositor = SceneCompositor::new(1);
    let before = compositor.composite(&base, &store);
    let reference = before.clone();

    store.delete_object(id).unwrap();
    assert_eq!(before, reference);
    // And the scene change shows up in the next flatten.
    assert_ne!(compositor.composite(&base, &store), reference);
}

#[test]
fn relocated_marker_blends_green_over_the_base() {
    let base = solid_image(100, 100, [0, 0, 0, 255]);
    let mut store = OverlayStore::new();
    let generation = store.reset();
    let object = overlay_object(10.0, 10.0, 20, 20);
    let id = object.id;
    store.populate(generation, vec![object]);
    store.move_object(id, 70.0, 70.0).unwrap();

    let flattened = SceneCompositor::new(1).composite(&base, &store);
    // Green #008000 at 0.4 opacity over black.
    assert_eq!(flattened.get_pixel(15, 15).0, [0, 51, 0, 255]);
    // Outside the marker the base is untouched.
    assert_eq!(flattened.get_pixel(5, 5).0, [0, 0, 0, 255]);
}

#[test]
fn removed_marker_blends_white_over_the_base() {
    let base = solid_image(100, 100, [0, 0, 0, 255]);
    let mut store = OverlayStore::new();
    let generation = store.reset();
    let object = overlay_object(10.0, 10.0, 20, 20);
    let id = object.id;
    store.populate(generation, vec![object]);
    store.delete_object(id).unwrap();

    let flattened = SceneCompositor::new(1).composite(&base, &store);
    assert_eq!(flattened.get_pixel(15, 15).0, [102, 102, 102, 255]);
}

#[test]
fn overlay_objects_are_drawn_at_their_current_position() {
    let base = solid_image(100, 100, [0, 0, 0, 255]);
    let mut store = OverlayStore::new();
    let generation = store.reset();
    let object = overlay_object(20.0, 20.0, 40, 40);
    let id = object.id;
    store.populate(generation, vec![object]);
    store.move_object(id, 30.0, 25.0).unwrap();

    let flattened = SceneCompositor::new(1).composite(&base, &store);
    // Fixture crops are solid [10, 20, 30]; sample the object interior,
    // clear of the outline stroke.
    assert_eq!(flattened.get_pixel(50, 45).0, [10, 20, 30, 255]);
}

#[test]
fn overlay_objects_carry_outline_and_delete_affordance() {
    let base = solid_image(100, 100, [0, 0, 0, 255]);
    let mut store = OverlayStore::new();
    let generation = store.reset();
    store.populate(generation, vec![overlay_object(20.0, 20.0, 40, 40)]);

    let flattened = SceneCompositor::new(1).composite(&base, &store);
    // The first dash of the top edge is always drawn.
    assert_eq!(flattened.get_pixel(22, 19).0, [0, 128, 0, 255]);
    // Delete affordance sits to the right of the object, red at 0.7 opacity
    // over black.
    let affordance = flattened.get_pixel(70, 25).0;
    assert!(affordance[0] >= 170, "expected red tint, got {affordance:?}");
    assert_eq!(affordance[1], 0);
    assert_eq!(affordance[2], 0);
}

#[test]
fn supersampling_scales_the_output_and_marker_geometry() {
    let base = solid_image(100, 100, [0, 0, 0, 255]);
    let mut store = OverlayStore::new();
    let generation = store.reset();
    let object = overlay_object(10.0, 10.0, 20, 20);
    let id = object.id;
    store.populate(generation, vec![object]);
    store.delete_object(id).unwrap();

    let flattened = SceneCompositor::new(3).composite(&base, &store);
    assert_eq!(flattened.dimensions(), (300, 300));
    // Marker rect lands at 3x its scene coordinates.
    assert_eq!(flattened.get_pixel(45, 45).0, [102, 102, 102, 255]);
    assert_eq!(flattened.get_pixel(20, 20).0, [0, 0, 0, 255]);
}
