//! Constrained space distribution ("water filling").
//!
//! Every item wants the same size `w`, clamped to its own bounds. The total
//! `Σ clamp(w, min_i, max_i)` is piecewise linear and non-decreasing in `w`,
//! with breakpoints at every distinct bound. We find the level at which the
//! total reaches the available space, then hand out the rounding remainder.

use std::collections::BTreeMap;

/// Inclusive size bounds of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeBounds {
    pub min: i32,
    pub max: i32,
}

impl SizeBounds {
    pub fn new(min: i32, max: i32) -> Self {
        debug_assert!(min <= max, "min {min} > max {max}");
        Self { min, max }
    }
}

/// Whether every item can get at least its minimum.
pub fn is_feasible(available: i32, items: &[SizeBounds]) -> bool {
    items.iter().map(|item| i64::from(item.min)).sum::<i64>() <= i64::from(available)
}

/// Splits `available` across `items` as evenly as their bounds allow.
///
/// Every result lies within its item's bounds. When
/// `Σ min <= available <= Σ max` the results sum to exactly `available`; above
/// `Σ max` every item gets its max. When the minimums alone do not fit, every
/// item gets its min and the total exceeds `available`: callers that must not
/// overflow check [`is_feasible`] first.
pub fn fill_space(available: i32, items: &[SizeBounds]) -> Vec<i32> {
    if items.is_empty() {
        return Vec::new();
    }

    if !is_feasible(available, items) {
        return items.iter().map(|item| item.min).collect();
    }

    let level = water_level(available, items);
    let mut sizes: Vec<i32> = items.iter().map(|item| level.clamp(item.min, item.max)).collect();
    distribute_remainder(available, level, &mut sizes, items);
    sizes
}

/// Number of items whose min / max sits at one breakpoint.
#[derive(Debug, Default, Clone, Copy)]
struct Fencepost {
    n_min: i64,
    n_max: i64,
}

#[derive(Debug)]
struct Segment {
    start: i64,
    end: i64,
    active: i64,
}

fn segments(items: &[SizeBounds]) -> Vec<Segment> {
    let mut fenceposts: BTreeMap<i32, Fencepost> = BTreeMap::new();
    for item in items {
        fenceposts.entry(item.min).or_default().n_min += 1;
        fenceposts.entry(item.max).or_default().n_max += 1;
    }

    let points: Vec<(i32, Fencepost)> = fenceposts.into_iter().collect();
    if let [(value, _)] = points.as_slice() {
        // Every item has min == max == value.
        return vec![Segment {
            start: i64::from(*value),
            end: i64::from(*value),
            active: items.len() as i64,
        }];
    }

    let mut active = 0;
    points
        .windows(2)
        .map(|pair| {
            let (start, at_start) = pair[0];
            let (end, _) = pair[1];
            active += at_start.n_min - at_start.n_max;
            Segment {
                start: i64::from(start),
                end: i64::from(end),
                active,
            }
        })
        .collect()
}

/// Solves `total(w) = available` for the largest integer `w` not overshooting.
fn water_level(available: i32, items: &[SizeBounds]) -> i32 {
    let available = i64::from(available);
    let segments = segments(items);
    let mut required: i64 = items.iter().map(|item| i64::from(item.min)).sum();

    for segment in &segments {
        let length = segment.end - segment.start;
        let capacity = length * segment.active;

        if required + capacity >= available {
            if capacity == 0 {
                return segment.start as i32;
            }
            // floor(start + length * (available - required) / capacity)
            let offset = (available - required) * length / capacity;
            return (segment.start + offset) as i32;
        }

        required += capacity;
    }

    segments.last().map_or(0, |segment| segment.end as i32)
}

/// Hands out what flooring the level left over, smallest headroom first.
fn distribute_remainder(available: i32, level: i32, sizes: &mut [i32], items: &[SizeBounds]) {
    let mut at_level: Vec<usize> = (0..sizes.len()).filter(|&i| sizes[i] == level).collect();
    at_level.sort_by_key(|&i| items[i].max);

    let mut remaining = i64::from(available) - sizes.iter().map(|&s| i64::from(s)).sum::<i64>();
    let mut items_left = at_level.len() as i64;

    for index in at_level {
        if remaining <= 0 {
            break;
        }

        let room = i64::from(items[index].max - sizes[index]);
        if room > 0 {
            let share = (remaining + items_left - 1) / items_left;
            let grow = room.min(share);
            sizes[index] += grow as i32;
            remaining -= grow;
        }

        items_left -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(pairs: &[(i32, i32)]) -> Vec<SizeBounds> {
        pairs.iter().map(|&(min, max)| SizeBounds::new(min, max)).collect()
    }

    #[test]
    fn test_even_split() {
        assert_eq!(fill_space(1000, &bounds(&[(100, 1000), (100, 1000)])), vec![500, 500]);
    }

    #[test]
    fn test_large_minimum_takes_priority() {
        assert_eq!(fill_space(1000, &bounds(&[(800, 1000), (100, 1000)])), vec![800, 200]);
    }

    #[test]
    fn test_capped_items() {
        assert_eq!(
            fill_space(900, &bounds(&[(100, 300), (100, 300), (100, 300)])),
            vec![300, 300, 300]
        );
    }

    #[test]
    fn test_remainder_is_distributed() {
        let sizes = fill_space(1001, &bounds(&[(100, 1000), (100, 1000)]));
        assert_eq!(sizes.iter().sum::<i32>(), 1001);
        assert!(sizes.contains(&500) && sizes.contains(&501));

        let sizes = fill_space(10, &bounds(&[(1, 10), (1, 10), (1, 10)]));
        assert_eq!(sizes.iter().sum::<i32>(), 10);
        assert!(sizes.iter().all(|&s| s == 3 || s == 4));
    }

    #[test]
    fn test_remainder_prefers_small_headroom() {
        // Level floors to 333; the item capped at 334 gets served first.
        let sizes = fill_space(1001, &bounds(&[(1, 1000), (1, 334), (1, 1000)]));
        assert_eq!(sizes.iter().sum::<i32>(), 1001);
        assert_eq!(sizes[1], 334);
    }

    #[test]
    fn test_above_total_max_gives_every_max() {
        assert_eq!(fill_space(5000, &bounds(&[(100, 300), (200, 1000)])), vec![300, 1000]);
    }

    #[test]
    fn test_infeasible_gives_every_min() {
        let items = bounds(&[(400, 1000), (400, 1000)]);
        assert!(!is_feasible(700, &items));
        assert_eq!(fill_space(700, &items), vec![400, 400]);
    }

    #[test]
    fn test_fixed_items() {
        assert_eq!(fill_space(600, &bounds(&[(300, 300), (300, 300)])), vec![300, 300]);
        assert_eq!(fill_space(650, &bounds(&[(300, 300), (100, 400)])), vec![300, 350]);
    }

    #[test]
    fn test_empty() {
        assert!(fill_space(100, &[]).is_empty());
    }

    #[test]
    fn test_feasible_inputs_sum_exactly() {
        let cases: &[(i32, &[(i32, i32)])] = &[
            (1037, &[(40, 900), (120, 300), (40, 1037), (500, 700)]),
            (1920, &[(40, 1920), (40, 1920), (40, 1920), (40, 1920), (40, 1920), (40, 1920), (40, 1920)]),
            (777, &[(1, 100), (50, 500), (200, 250), (1, 777)]),
            (1000, &[(100, 200), (300, 400), (350, 450)]),
            (523, &[(7, 13), (7, 600), (11, 600), (13, 17)]),
        ];

        for &(available, pairs) in cases {
            let items = bounds(pairs);
            let sizes = fill_space(available, &items);
            assert_eq!(sizes.iter().sum::<i32>(), available, "case {available} {pairs:?}");
            for (size, item) in sizes.iter().zip(&items) {
                assert!((item.min..=item.max).contains(size), "{size} outside {item:?}");
            }
        }
    }
}
