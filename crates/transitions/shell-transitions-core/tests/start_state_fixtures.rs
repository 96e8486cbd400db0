use shell_transitions::{default_fade_targets, start_state, TransitionType};
use shell_transitions_fixtures::transitions;
use surface_api::{Matrix2, Point, SurfaceId};

#[test]
fn open_app_raises_the_opening_window_transparent() {
    let info = transitions::load("open-app").expect("fixture");
    assert_eq!(info.kind, TransitionType::Open);
    let t = start_state(&info);

    let opening = SurfaceId(2);
    assert_eq!(t.visibility_of(opening), Some(true));
    assert_eq!(t.layer_of(opening), Some(1));
    assert_eq!(t.alpha_of(opening), Some(0.0));
    assert_eq!(t.matrix_of(opening), Some(Matrix2::IDENTITY));
    assert_eq!(t.parent_of(opening), Some(Some(SurfaceId(100))));

    let behind = SurfaceId(1);
    assert_eq!(t.layer_of(behind), Some(0));
    assert_eq!(t.alpha_of(behind), None);
    assert_eq!(t.visibility_of(SurfaceId(100)), Some(true));

    assert_eq!(default_fade_targets(&info), vec![(opening, true)]);
}

#[test]
fn closing_batch_puts_closing_windows_on_top() {
    let info = transitions::load("close-to-back").expect("fixture");
    let t = start_state(&info);

    assert_eq!(t.layer_of(SurfaceId(1)), Some(3));
    assert_eq!(t.layer_of(SurfaceId(3)), Some(1));
    assert_eq!(t.layer_of(SurfaceId(2)), Some(-1));
    assert_eq!(t.alpha_of(SurfaceId(2)), Some(1.0));

    // Positions are relative to the root offset.
    assert_eq!(t.position_of(SurfaceId(1)), Some(Point::new(0, 0)));
    assert_eq!(t.position_of(SurfaceId(2)), Some(Point::new(50, 100)));

    assert_eq!(
        default_fade_targets(&info),
        vec![(SurfaceId(3), false), (SurfaceId(1), false)]
    );
}

#[test]
fn starting_window_recipient_starts_opaque_and_is_not_faded() {
    let info = transitions::load("starting-window").expect("fixture");
    let t = start_state(&info);
    assert_eq!(t.alpha_of(SurfaceId(6)), Some(1.0));
    assert_eq!(t.layer_of(SurfaceId(6)), Some(1));
    assert_eq!(t.layer_of(SurfaceId(5)), Some(0));
    assert!(default_fade_targets(&info).is_empty());
}

#[test]
fn nested_change_is_left_under_its_parent() {
    let info = transitions::load("nested-change").expect("fixture");
    let t = start_state(&info);

    let child = SurfaceId(8);
    assert_eq!(t.parent_of(child), None, "child must not be reparented");
    assert_eq!(t.layer_of(child), None);
    assert_eq!(t.position_of(child), Some(Point::new(30, 40)));
    assert_eq!(t.alpha_of(child), Some(1.0));

    assert_eq!(t.layer_of(SurfaceId(7)), Some(2));
    assert_eq!(default_fade_targets(&info), vec![(SurfaceId(7), true)]);
}

#[test]
fn invalid_root_fixture_has_nothing_to_set_up() {
    let info = transitions::load("invalid-root").expect("fixture");
    assert!(!info.has_valid_root());
    assert!(start_state(&info).is_empty());
}
