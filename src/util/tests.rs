use super::{BoundedDeque, Vec2D};
use std::f64::consts::FRAC_PI_2;

#[test]
fn perp_unit_is_orthogonal_and_oriented() {
    let v = Vec2D::<f64>::new(3.0, 4.0);
    let ccw = v.perp_unit(false);
    let cw = v.perp_unit(true);
    assert!(v.dot(&ccw).abs() < 1e-12);
    assert!(v.dot(&cw).abs() < 1e-12);
    assert!((ccw.abs() - 1.0).abs() < 1e-12);
    assert!(v.cross(&ccw) > 0.0);
    assert!(v.cross(&cw) < 0.0);
}

#[test]
fn from_polar_matches_rotation() {
    let mut unit = Vec2D::<f64>::new(1.0, 0.0);
    unit.rotate_by(FRAC_PI_2);
    let polar = Vec2D::<f64>::from_polar(FRAC_PI_2, 1.0);
    assert!(unit.euclid_distance(&polar) < 1e-12);
    assert!((polar.angle() - FRAC_PI_2).abs() < 1e-12);
}

#[test]
fn bounded_deque_rejects_overflow_and_pops_in_order() {
    let mut deque = BoundedDeque::new(3);
    assert!(deque.push(1));
    assert!(deque.push(2));
    assert!(deque.push(3));
    assert!(!deque.push(4));
    assert_eq!(deque.len(), 3);
    assert_eq!(deque.remaining(), 0);
    assert_eq!(deque.get(1), Some(&2));
    assert_eq!(deque.pop_front(), Some(1));
    assert_eq!(deque.pop_front(), Some(2));
    assert!(deque.push(4));
    assert_eq!(deque.back(), Some(&4));
    assert_eq!(deque.front(), Some(&3));
}
