//! Random identifier allocation with bounded collision retry
//!
//! Column and row ids are drawn uniformly from a range that grows with the
//! number of entries. A draw that collides with a taken id is redrawn, at
//! most `max_attempts` times; a range with no free slot fails up front.

use rand::Rng;

use crate::error::{CqlError, CqlResult};

/// Draw an id in `[low, high]` for which `is_taken` returns false.
///
/// `taken` is the number of ids already occupying the range; when it covers
/// the whole range no draw is attempted.
pub(crate) fn draw_unique<R, F>(
    rng: &mut R,
    low: u32,
    high: u32,
    taken: usize,
    max_attempts: u32,
    resource: &'static str,
    is_taken: F,
) -> CqlResult<u32>
where
    R: Rng + ?Sized,
    F: Fn(u32) -> bool,
{
    let span = u64::from(high.saturating_sub(low)) + 1;
    if high < low || taken as u64 >= span {
        return Err(CqlError::ResourceExhausted { resource, attempts: 0 });
    }

    for _ in 0..max_attempts {
        let candidate = rng.gen_range(low..=high);
        if !is_taken(candidate) {
            return Ok(candidate);
        }
    }

    Err(CqlError::ResourceExhausted { resource, attempts: max_attempts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_draw_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..500 {
            let id = draw_unique(&mut rng, 1, 20, 0, 10, "column id", |_| false).unwrap();
            assert!((1..=20).contains(&id));
        }
    }

    #[test]
    fn test_draw_skips_taken() {
        let mut rng = StdRng::seed_from_u64(2);
        let taken: HashSet<u32> = (0..10).filter(|v| *v != 6).collect();
        let id = draw_unique(&mut rng, 0, 9, taken.len(), 10_000, "row id", |c| taken.contains(&c))
            .unwrap();
        assert_eq!(id, 6);
    }

    #[test]
    fn test_full_range_is_exhausted_without_drawing() {
        let mut rng = StdRng::seed_from_u64(3);
        let err = draw_unique(&mut rng, 1, 4, 4, 100, "column id", |_| true).unwrap_err();
        match err {
            CqlError::ResourceExhausted { resource, attempts } => {
                assert_eq!(resource, "column id");
                assert_eq!(attempts, 0);
            }
            other => panic!("expected ResourceExhausted, got {:?}", other),
        }
    }

    #[test]
    fn test_retry_bound_is_honored() {
        let mut rng = StdRng::seed_from_u64(4);
        // Range reports free slots but every draw collides.
        let err = draw_unique(&mut rng, 0, 100, 1, 25, "row id", |_| true).unwrap_err();
        assert!(matches!(err, CqlError::ResourceExhausted { attempts: 25, .. }));
    }
}
