//! Display colors derived from column order and time order.
//!
//! Recomputed from the canonical state every frame; never stored on the board.

use std::collections::HashMap;

use super::types::BoardState;

/// Number of base colors in the UI palette
pub const PALETTE_SIZE: usize = 8;

/// Visual color bucket for one job block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorSlot {
    /// Index into the palette, from the driver's column position
    pub palette_index: usize,
    /// Alternating shade so adjacent blocks in a column stay distinguishable
    pub alternate: bool,
}

/// Assign a color slot to every scheduled job, keyed by job id.
///
/// Columns take palette colors in driver order; within a column, jobs alternate
/// shades by start time. Jobs on a driver not in the roster are left out.
pub fn color_map(state: &BoardState) -> HashMap<String, ColorSlot> {
    let mut colors = HashMap::new();

    for (column, driver) in state.drivers.iter().enumerate() {
        for (ordinal, job) in state.jobs_for_driver(&driver.id).into_iter().enumerate() {
            colors.insert(
                job.id.clone(),
                ColorSlot {
                    palette_index: column % PALETTE_SIZE,
                    alternate: ordinal % 2 == 1,
                },
            );
        }
    }

    colors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::types::{Driver, Job};

    #[test]
    fn colors_follow_column_and_time_order() {
        let state = BoardState {
            drivers: vec![Driver::new("D1", "Sato", "A"), Driver::new("D2", "Ito", "B")],
            jobs: vec![
                Job::pending("late", "late", 30).scheduled("D1", "11:00"),
                Job::pending("early", "early", 30).scheduled("D1", "08:00"),
                Job::pending("d2", "d2", 30).scheduled("D2", "08:00"),
                Job::pending("ghost", "ghost", 30).scheduled("D9", "08:00"),
            ],
            ..Default::default()
        };

        let colors = color_map(&state);
        assert_eq!(colors["early"], ColorSlot { palette_index: 0, alternate: false });
        assert_eq!(colors["late"], ColorSlot { palette_index: 0, alternate: true });
        assert_eq!(colors["d2"], ColorSlot { palette_index: 1, alternate: false });
        assert!(!colors.contains_key("ghost"));
    }

    #[test]
    fn recomputation_is_deterministic() {
        let state = BoardState {
            drivers: (0..10).map(|i| Driver::new(format!("D{i}"), "x", "v")).collect(),
            jobs: (0..10)
                .map(|i| Job::pending(format!("J{i}"), "j", 15).scheduled(format!("D{i}"), "09:00"))
                .collect(),
            ..Default::default()
        };

        assert_eq!(color_map(&state), color_map(&state));
        assert_eq!(color_map(&state)["J9"].palette_index, 1);
    }
}
