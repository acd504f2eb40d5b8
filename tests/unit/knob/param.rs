use super::*;

#[test]
fn plain_value_without_keyframes() {
    let knob = Knob::new(0.5);
    assert_eq!(knob.value_at(FrameTime(0)), 0.5);
    knob.set_value(0.9);
    assert_eq!(knob.value_at(FrameTime(42)), 0.9);
}

#[test]
fn scalar_keyframes_interpolate_linearly() {
    let knob = Knob::new(0.0);
    knob.set_value_at_time(FrameTime(0), 0.0);
    knob.set_value_at_time(FrameTime(10), 1.0);
    assert_eq!(knob.value_at(FrameTime(5)), 0.5);
    assert_eq!(knob.value_at(FrameTime(10)), 1.0);
    assert_eq!(knob.value_at(FrameTime(20)), 1.0);
}

#[test]
fn discrete_keyframes_hold_until_the_next() {
    let toggles = Knob::new(false);
    toggles.set_value_at_time(FrameTime(0), false);
    toggles.set_value_at_time(FrameTime(10), true);
    assert!(!toggles.value_at(FrameTime(9)));
    assert!(toggles.value_at(FrameTime(10)));

    let widths = Knob::new(0i32);
    widths.set_value_at_time(FrameTime(0), 2);
    widths.set_value_at_time(FrameTime(10), 8);
    assert_eq!(widths.value_at(FrameTime(9)), 2);
}

#[test]
fn slaved_knob_answers_with_the_master() {
    let master = Arc::new(Knob::new(0.25));
    let slave = Knob::new(1.0);
    slave.slave_to(&master);
    assert!(slave.is_slaved());
    assert_eq!(slave.value_at(FrameTime(0)), 0.25);

    master.set_value(0.75);
    assert_eq!(slave.value_at(FrameTime(0)), 0.75);

    slave.unslave();
    assert!(!slave.is_slaved());
    assert_eq!(slave.value_at(FrameTime(0)), 1.0);
}

#[test]
fn clone_copies_values_but_not_link_state() {
    let master = Arc::new(Knob::new(0.0));
    let a = Knob::new(0.3);
    a.set_value_at_time(FrameTime(1), 0.6);
    let b = Knob::new(0.0);
    b.slave_to(&master);
    b.clone_from_knob(&a);
    assert!(b.is_slaved());
    b.unslave();
    assert_eq!(b.value_at(FrameTime(1)), 0.6);
}

#[test]
fn own_state_round_trips() {
    let a = Knob::new(0.4);
    a.set_value_at_time(FrameTime(2), 0.1);
    a.set_value_at_time(FrameTime(6), 0.9);

    let (value, keys) = a.own_state();
    let b = Knob::new(0.0);
    b.load_state(value, keys);
    assert_eq!(b.value_at(FrameTime(2)), 0.1);
    assert_eq!(b.value_at(FrameTime(4)), 0.5);
    assert_eq!(b.value_at(FrameTime(6)), 0.9);
}

#[test]
fn enabled_and_dirty_flags_are_plain_state() {
    let knob = Knob::new(1.0);
    assert!(knob.is_enabled());
    knob.set_enabled(false);
    assert!(!knob.is_enabled());
    assert!(!knob.is_dirty());
    knob.set_dirty(true);
    assert!(knob.is_dirty());
}
