//! Context window arithmetic
//!
//! Given the span of positions a search touched inside one group, decide
//! which neighbouring positions to fetch so the group contributes
//! `window_size` chunks where it has that many.

use mosaic_common::document::{Chunk, GroupKey};
use mosaic_common::errors::{AppError, Result};

/// Positions seen for one group while scanning a result list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsolidatedGroup {
    pub group_key: GroupKey,
    pub min_position: usize,
    pub max_position: usize,
    pub group_size: usize,
}

impl ConsolidatedGroup {
    pub fn from_chunk(chunk: &Chunk) -> Self {
        Self {
            group_key: chunk.group_key.clone(),
            min_position: chunk.position,
            max_position: chunk.position,
            group_size: chunk.group_size,
        }
    }

    /// Widen the span to include `chunk`; the latest group size wins
    pub fn absorb(&mut self, chunk: &Chunk) {
        self.min_position = self.min_position.min(chunk.position);
        self.max_position = self.max_position.max(chunk.position);
        self.group_size = chunk.group_size;
    }

    pub fn window(&self, window_size: usize) -> Result<(usize, usize)> {
        compute_window(self.min_position, self.max_position, self.group_size, window_size)
    }
}

/// Inclusive `(start, end)` positions to fetch for one group.
///
/// Padding is split evenly with the odd chunk going after the span. A
/// window that runs off the front moves its deficit to the back; one that
/// then runs off the back moves it to the front, stopping at position 0.
/// Spans that already cover `window_size` come back unchanged.
///
/// Fails with `InvalidWindow` when `min_position > max_position` or
/// `max_position` does not fit inside the group.
pub fn compute_window(
    min_position: usize,
    max_position: usize,
    group_size: usize,
    window_size: usize,
) -> Result<(usize, usize)> {
    if min_position > max_position {
        return Err(AppError::InvalidWindow {
            message: format!("min position {min_position} is after max position {max_position}"),
        });
    }
    if max_position >= group_size {
        return Err(AppError::InvalidWindow {
            message: format!("position {max_position} is outside a group of {group_size} chunks"),
        });
    }

    // A window wider than the group selects the whole group
    let window_size = window_size.min(group_size);
    let covered = max_position - min_position + 1;
    if covered >= window_size {
        return Ok((min_position, max_position));
    }

    let room_before = min_position;
    let room_after = group_size - 1 - max_position;
    let remaining = window_size - covered;
    let mut before = remaining / 2;
    let mut after = remaining - before;

    if before > room_before {
        after += before - room_before;
        before = room_before;
    }
    if after > room_after {
        before = (before + after - room_after).min(room_before);
        after = room_after;
    }

    Ok((min_position - before, max_position + after))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_clamp_low_end() {
        assert_eq!(compute_window(0, 0, 10, 5).unwrap(), (0, 4));
    }

    #[test]
    fn test_clamp_high_end() {
        assert_eq!(compute_window(8, 9, 10, 5).unwrap(), (5, 9));
    }

    #[test]
    fn test_covered_span_unchanged() {
        assert_eq!(compute_window(2, 6, 20, 3).unwrap(), (2, 6));
    }

    #[test]
    fn test_odd_remainder_goes_after() {
        // remaining 3 splits into 1 before, 2 after
        assert_eq!(compute_window(5, 5, 20, 4).unwrap(), (4, 7));
        assert_eq!(compute_window(5, 6, 20, 5).unwrap(), (4, 8));
    }

    #[test]
    fn test_small_window_is_noop() {
        assert_eq!(compute_window(3, 3, 10, 1).unwrap(), (3, 3));
        assert_eq!(compute_window(3, 3, 10, 0).unwrap(), (3, 3));
    }

    #[test]
    fn test_small_group_selects_everything() {
        assert_eq!(compute_window(1, 1, 3, 5).unwrap(), (0, 2));
        assert_eq!(compute_window(0, 0, 1, 3).unwrap(), (0, 0));
    }

    #[test]
    fn test_huge_window_selects_whole_group() {
        assert_eq!(compute_window(0, 0, 10, usize::MAX).unwrap(), (0, 9));
        assert_eq!(compute_window(4, 6, 10, usize::MAX).unwrap(), (0, 9));
        assert_eq!(compute_window(9, 9, 10, usize::MAX - 1).unwrap(), (0, 9));
    }

    #[test]
    fn test_both_sides_constrained() {
        assert_eq!(compute_window(2, 3, 6, 10).unwrap(), (0, 5));
    }

    #[test]
    fn test_inconsistent_positions_rejected() {
        let err = compute_window(5, 4, 10, 3).unwrap_err();
        assert!(matches!(err, AppError::InvalidWindow { .. }));

        let err = compute_window(2, 10, 10, 3).unwrap_err();
        assert!(matches!(err, AppError::InvalidWindow { .. }));
    }

    #[test]
    fn test_group_accumulates_span() {
        let chunk = |position| Chunk {
            id: format!("c{position}"),
            text: String::new(),
            group_key: GroupKey::default(),
            position,
            group_size: 12,
            declared_overlap: 0,
        };

        let mut group = ConsolidatedGroup::from_chunk(&chunk(6));
        group.absorb(&chunk(3));
        group.absorb(&chunk(4));
        assert_eq!((group.min_position, group.max_position), (3, 6));
        assert_eq!(group.window(6).unwrap(), (2, 7));
    }

    proptest! {
        #[test]
        fn window_contains_span_and_stays_in_group(
            group_size in 1usize..60,
            a in 0usize..60,
            b in 0usize..60,
            window_size in 0usize..80,
        ) {
            let min = a.min(b) % group_size;
            let max = (a.max(b) % group_size).max(min);
            let (start, end) = compute_window(min, max, group_size, window_size).unwrap();

            prop_assert!(start <= min);
            prop_assert!(end >= max);
            prop_assert!(end < group_size);

            let covered = max - min + 1;
            prop_assert_eq!(end - start + 1, covered.max(window_size.min(group_size)));
        }
    }
}
