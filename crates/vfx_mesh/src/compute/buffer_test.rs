use rayon::prelude::*;

use super::*;

#[test]
fn test_atomic_min_keeps_smallest_under_contention() {
  let buffer = FloatBuffer::new(1, "test").unwrap();
  buffer.store(0, 100.0);
  (0..10_000).into_par_iter().for_each(|i| {
    buffer.atomic_min(0, (i % 977) as f32 - 3.0);
  });
  assert_eq!(buffer.load(0), -3.0);
}

#[test]
fn test_atomic_add_sums_all_contributions() {
  let buffer = FloatBuffer::new(1, "test").unwrap();
  (0..4096).into_par_iter().for_each(|_| buffer.atomic_add(0, 0.5));
  assert_eq!(buffer.load(0), 2048.0);
}

#[test]
fn test_fetch_add_returns_previous_value() {
  let counters = U32Buffer::new(2, 0, "counters").unwrap();
  assert_eq!(counters.fetch_add(1, 6), 0);
  assert_eq!(counters.fetch_add(1, 6), 6);
  assert_eq!(counters.load(1), 12);
  assert_eq!(counters.load(0), 0);
}

#[test]
fn test_fill_and_copy() {
  let a = FloatBuffer::new(300, "a").unwrap();
  let b = FloatBuffer::new(300, "b").unwrap();
  a.fill(1.25);
  b.copy_from(&a);
  assert!(b.read_prefix(300).iter().all(|&v| v == 1.25));
}

#[test]
fn test_read_prefix_clamps_to_len() {
  let buffer = U32Buffer::new(4, 7, "test").unwrap();
  assert_eq!(buffer.read_prefix(10), vec![7, 7, 7, 7]);
}

#[test]
fn test_allocation_failure_is_reported() {
  let result = FloatBuffer::new(usize::MAX, "huge");
  assert!(matches!(
    result,
    Err(SdfError::ResourceExhausted { what: "huge", .. })
  ));
}

#[test]
fn test_smooth_min_degenerates_to_min() {
  assert_eq!(smooth_min(1.0, 2.0, 0.0), 1.0);
  assert_eq!(smooth_max(1.0, 2.0, 0.0), 2.0);
}

#[test]
fn test_smooth_min_is_below_min_near_seam() {
  let k = 0.5;
  let blended = smooth_min(0.1, 0.1, k);
  assert!(blended < 0.1);
  assert!((blended - (0.1 - k * 0.25)).abs() < 1e-6);
  // Far apart values are untouched.
  assert_eq!(smooth_min(0.0, 10.0, k), 0.0);
}
