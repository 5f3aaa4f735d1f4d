//! Fractional order keys.
//!
//! Keys are spaced [`ORDER_STEP`] apart so an entity can be placed after or
//! between neighbours without renumbering the collection. Inserting
//! repeatedly between the same two neighbours halves the gap each time and
//! eventually exhausts f64 precision; nothing here renumbers, but collapsed
//! gaps are detected and reported.

use tracing::warn;

pub const ORDER_STEP: f64 = 10000.0;

/// Key given to the first entity of an empty collection.
pub const BASE_ORDER: f64 = ORDER_STEP;

/// Neighbouring keys closer than this are considered collapsed.
pub const MIN_ORDER_GAP: f64 = 1e-6;

/// Key for an entity appended after `last` (or into an empty collection).
pub fn next_order(last: Option<f64>) -> f64 {
    match last {
        Some(last) => last + ORDER_STEP,
        None => BASE_ORDER,
    }
}

/// Key for an entity placed between `lower` and `upper`.
///
/// Without a lower neighbour the key lands one step above `upper`.
pub fn between_order(lower: Option<f64>, upper: f64) -> f64 {
    match lower {
        Some(lower) => {
            let mid = (lower + upper) / 2.0;
            if (upper - lower).abs() < MIN_ORDER_GAP || mid == lower || mid == upper {
                warn!(lower, upper, "Order keys have collapsed, collection needs renumbering");
            }
            mid
        }
        None => upper + ORDER_STEP,
    }
}

/// Whether any two adjacent keys of an ascending sequence have collapsed.
pub fn needs_compaction(sorted_keys: &[f64]) -> bool {
    sorted_keys
        .windows(2)
        .any(|pair| pair[1] - pair[0] < MIN_ORDER_GAP)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_order() {
        assert_eq!(next_order(None), 10000.0);
        assert_eq!(next_order(Some(20000.0)), 30000.0);
        assert_eq!(next_order(Some(0.5)), 10000.5);
    }

    #[test]
    fn test_between_order() {
        assert_eq!(between_order(Some(10000.0), 20000.0), 15000.0);
        assert_eq!(between_order(None, 20000.0), 30000.0);
    }

    #[test]
    fn test_repeated_bisection_eventually_collapses() {
        let lower = 10000.0;
        let mut upper = 20000.0;
        let mut keys = vec![lower, upper];

        for _ in 0..80 {
            upper = between_order(Some(lower), upper);
            keys.push(upper);
        }
        keys.sort_by(f64::total_cmp);

        assert!(needs_compaction(&keys));
    }

    #[test]
    fn test_spaced_keys_do_not_need_compaction() {
        assert!(!needs_compaction(&[10000.0, 15000.0, 20000.0]));
        assert!(!needs_compaction(&[]));
        assert!(!needs_compaction(&[10000.0]));
    }
}
