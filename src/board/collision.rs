//! Overlap and vehicle checks for proposed placements.
//!
//! Everything here is a pure function over borrowed board data. Conflicts are
//! reported as flags because a drag passes through many invalid positions
//! before it lands; nothing in this module mutates the board.

use super::time::{floor_to_slot, SLOT_MINUTES};
use super::types::{Driver, Job, Split};

/// A placement being considered for a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Proposal<'a> {
    pub driver_id: &'a str,
    pub start_min: u32,
    pub duration: u32,
    /// The job being moved/resized, so it never collides with itself
    pub ignore_job_id: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionResult {
    pub is_overlap_error: bool,
    /// Requested duration, or the clamped one for a resize
    pub adjusted_duration: u32,
}

/// [start, end) of every other scheduled job on the proposal's column
fn other_intervals(proposal: &Proposal<'_>, jobs: &[Job]) -> Vec<(u32, u32)> {
    jobs.iter()
        .filter(|job| job.is_on(proposal.driver_id))
        .filter(|job| Some(job.id.as_str()) != proposal.ignore_job_id)
        .filter_map(Job::interval)
        .collect()
}

/// Split times on one column (unparsable times are skipped)
fn split_times<'a>(driver_id: &'a str, splits: &'a [Split]) -> impl Iterator<Item = u32> + 'a {
    splits
        .iter()
        .filter(move |split| split.driver_id == driver_id)
        .filter_map(|split| split.time_minutes().ok())
}

/// Current interval of the job being edited, if it is on the board
fn current_interval(proposal: &Proposal<'_>, jobs: &[Job]) -> Option<(u32, u32)> {
    let id = proposal.ignore_job_id?;
    jobs.iter().find(|job| job.id == id).and_then(Job::interval)
}

/// Check a proposed placement against the other jobs and splits on its column.
///
/// Move (`is_resize == false`): any intersection of half-open intervals, or a
/// start exactly on a split time, is an overlap error. Nothing is clamped.
///
/// Resize (`is_resize == true`): the start is fixed and the end grows. The
/// duration is clamped to stop at the next job or at the next split beyond the
/// job's current end. It is only an error when the start itself is inside
/// another job or not even one slot fits.
pub fn compute_collision(
    proposal: Proposal<'_>,
    jobs: &[Job],
    splits: &[Split],
    is_resize: bool,
) -> CollisionResult {
    let start = proposal.start_min;
    let end = start + proposal.duration;
    let others = other_intervals(&proposal, jobs);

    if !is_resize {
        let hits_job = others.iter().any(|&(s, e)| start < e && s < end);
        let hits_split = split_times(proposal.driver_id, splits).any(|t| t == start);
        return CollisionResult {
            is_overlap_error: hits_job || hits_split,
            adjusted_duration: proposal.duration,
        };
    }

    let current = current_interval(&proposal, jobs);
    let start_inside = others.iter().any(|&(s, e)| s <= start && start < e);

    // Splits already inside the job (inserted after it was placed) are left alone
    let current_end = current.map(|(_, e)| e).unwrap_or(start);
    let next_job = others.iter().map(|&(s, _)| s).filter(|&s| s > start);
    let next_split = split_times(proposal.driver_id, splits).filter(|&t| t > start && t >= current_end);
    let limit = next_job.chain(next_split).min();

    let adjusted = match limit {
        Some(limit) => proposal.duration.min(floor_to_slot(limit - start)),
        None => proposal.duration,
    };

    // Nothing fits before the next neighbour: keep the job's current length
    if adjusted < SLOT_MINUTES {
        return CollisionResult {
            is_overlap_error: true,
            adjusted_duration: current.map(|(s, e)| e - s).unwrap_or(SLOT_MINUTES),
        };
    }

    // A start inside another job is reported, but the end is still clamped
    CollisionResult {
        is_overlap_error: start_inside,
        adjusted_duration: adjusted,
    }
}

/// Clamp a top-handle resize: the end stays at `end_min` and the start may not
/// move above the previous job's end or a split before the job's current start.
///
/// The result always leaves at least one slot (`end_min - 15`).
pub fn clamp_resize_start(
    proposal: Proposal<'_>,
    end_min: u32,
    jobs: &[Job],
    splits: &[Split],
) -> u32 {
    let requested = proposal.start_min;
    let current_start = current_interval(&proposal, jobs).map(|(s, _)| s).unwrap_or(end_min);

    let prev_job_end = other_intervals(&proposal, jobs)
        .into_iter()
        .filter(|&(s, e)| s < end_min && e <= end_min)
        .map(|(_, e)| e);
    let prev_split = split_times(proposal.driver_id, splits).filter(|&t| t < end_min && t <= current_start);
    let floor = prev_job_end.chain(prev_split).max().unwrap_or(0);

    requested.max(floor).min(end_min.saturating_sub(SLOT_MINUTES))
}

/// Vehicle in use on a column at `start_min`.
///
/// The driver's base vehicle, overridden by the latest split on that column
/// whose time is at or before `start_min`.
pub fn effective_vehicle<'a>(
    driver_id: &str,
    start_min: u32,
    splits: &'a [Split],
    drivers: &'a [Driver],
) -> Option<&'a str> {
    let base = drivers
        .iter()
        .find(|d| d.id == driver_id)
        .map(|d| d.current_vehicle.as_str());

    let mut on_column: Vec<(u32, &Split)> = splits
        .iter()
        .filter(|s| s.driver_id == driver_id)
        .filter_map(|s| s.time_minutes().ok().map(|t| (t, s)))
        .collect();
    on_column.sort_by_key(|(t, _)| *t);

    on_column
        .iter()
        .rev()
        .find(|(t, _)| *t <= start_min)
        .map(|(_, s)| s.vehicle.as_str())
        .or(base)
}

/// Whether a job requiring `required_vehicle` at this column/time is a vehicle mismatch.
///
/// Advisory only: callers store the flag on the job and never block on it.
pub fn check_vehicle_compatibility(
    driver_id: &str,
    start_min: u32,
    splits: &[Split],
    drivers: &[Driver],
    required_vehicle: Option<&str>,
) -> bool {
    match required_vehicle {
        Some(required) if !required.is_empty() => {
            effective_vehicle(driver_id, start_min, splits, drivers) != Some(required)
        }
        _ => false,
    }
}

/// Whether dropping a split at `time_min` on `driver_id` conflicts.
///
/// Conflicts are a job covering that time (`start <= t < end`) or another split
/// at exactly that time on the same column.
pub fn check_split_collision(
    driver_id: &str,
    time_min: u32,
    ignore_split_id: Option<&str>,
    jobs: &[Job],
    splits: &[Split],
) -> bool {
    let covered = jobs
        .iter()
        .filter(|job| job.is_on(driver_id))
        .filter_map(Job::interval)
        .any(|(s, e)| s <= time_min && time_min < e);

    let duplicate = splits
        .iter()
        .filter(|s| s.driver_id == driver_id)
        .filter(|s| Some(s.id.as_str()) != ignore_split_id)
        .any(|s| s.time_minutes().ok() == Some(time_min));

    covered || duplicate
}

/// Every pair of overlapping scheduled jobs on the board, by id.
///
/// Used after a wholesale state replacement, where nothing went through the
/// drag controller.
pub fn find_overlaps(jobs: &[Job]) -> Vec<(String, String)> {
    let mut placed: Vec<(&str, u32, u32, &str)> = jobs
        .iter()
        .filter_map(|job| {
            let (s, e) = job.interval()?;
            Some((job.driver_id.as_deref()?, s, e, job.id.as_str()))
        })
        .collect();
    placed.sort();

    let mut overlaps = Vec::new();
    for (i, &(driver, _, end, id)) in placed.iter().enumerate() {
        for &(other_driver, other_start, _, other_id) in &placed[i + 1..] {
            if other_driver != driver || other_start >= end {
                break;
            }
            overlaps.push((id.to_string(), other_id.to_string()));
        }
    }
    overlaps
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn job(id: &str, driver: &str, start: &str, duration: u32) -> Job {
        Job::pending(id, id, duration).scheduled(driver, start)
    }

    fn split(id: &str, driver: &str, time: &str, vehicle: &str) -> Split {
        Split {
            id: id.to_string(),
            driver_id: driver.to_string(),
            time: time.to_string(),
            driver_name: "Relief".to_string(),
            vehicle: vehicle.to_string(),
        }
    }

    fn proposal<'a>(driver_id: &'a str, start_min: u32, duration: u32, ignore: Option<&'a str>) -> Proposal<'a> {
        Proposal {
            driver_id,
            start_min,
            duration,
            ignore_job_id: ignore,
        }
    }

    #[test]
    fn back_to_back_jobs_do_not_overlap() {
        let jobs = vec![job("A", "D1", "09:00", 30)];
        let result = compute_collision(proposal("D1", 570, 30, None), &jobs, &[], false);
        assert!(!result.is_overlap_error);

        let before = compute_collision(proposal("D1", 510, 30, None), &jobs, &[], false);
        assert!(!before.is_overlap_error);
    }

    #[test]
    fn intersecting_jobs_overlap() {
        let jobs = vec![job("A", "D1", "09:00", 30)];
        let result = compute_collision(proposal("D1", 555, 30, None), &jobs, &[], false);
        assert!(result.is_overlap_error);
        assert_eq!(result.adjusted_duration, 30);
    }

    #[test]
    fn other_columns_and_the_moving_job_are_ignored() {
        let jobs = vec![job("A", "D1", "09:00", 60), job("B", "D2", "09:00", 60)];
        let onto_other_driver = compute_collision(proposal("D3", 540, 60, None), &jobs, &[], false);
        assert!(!onto_other_driver.is_overlap_error);

        let nudge_self = compute_collision(proposal("D1", 555, 60, Some("A")), &jobs, &[], false);
        assert!(!nudge_self.is_overlap_error);
    }

    #[test]
    fn move_onto_a_split_time_is_rejected() {
        let splits = vec![split("S1", "D1", "12:00", "TruckB")];
        let on_split = compute_collision(proposal("D1", 720, 30, None), &[], &splits, false);
        assert!(on_split.is_overlap_error);

        let across_split = compute_collision(proposal("D1", 705, 30, None), &[], &splits, false);
        assert!(!across_split.is_overlap_error);

        let other_column = compute_collision(proposal("D2", 720, 30, None), &[], &splits, false);
        assert!(!other_column.is_overlap_error);
    }

    #[test]
    fn resize_clamps_to_the_following_job() {
        let jobs = vec![job("A", "D1", "09:00", 60), job("B", "D1", "10:00", 30)];
        let result = compute_collision(proposal("D1", 540, 90, Some("A")), &jobs, &[], true);
        assert!(!result.is_overlap_error);
        assert!(result.adjusted_duration <= 60);
        assert_eq!(result.adjusted_duration, 60);
    }

    #[test]
    fn resize_without_neighbours_keeps_the_request() {
        let jobs = vec![job("A", "D1", "09:00", 60)];
        let result = compute_collision(proposal("D1", 540, 120, Some("A")), &jobs, &[], true);
        assert_eq!(result, CollisionResult { is_overlap_error: false, adjusted_duration: 120 });
    }

    #[test]
    fn resize_stops_at_a_split_beyond_the_job() {
        let jobs = vec![job("A", "D1", "11:00", 30)];
        let splits = vec![split("S1", "D1", "12:00", "TruckB")];
        let result = compute_collision(proposal("D1", 660, 120, Some("A")), &jobs, &splits, true);
        assert_eq!(result.adjusted_duration, 60);
    }

    #[test]
    fn resize_ignores_a_split_already_inside_the_job() {
        // Split inserted over an existing job is not retroactively enforced
        let jobs = vec![job("A", "D1", "11:00", 120)];
        let splits = vec![split("S1", "D1", "12:00", "TruckB")];
        let result = compute_collision(proposal("D1", 660, 150, Some("A")), &jobs, &splits, true);
        assert_eq!(result.adjusted_duration, 150);
    }

    #[test]
    fn resize_starting_inside_another_job_is_an_error() {
        let jobs = vec![job("A", "D1", "09:00", 60)];
        let result = compute_collision(proposal("D1", 555, 30, None), &jobs, &[], true);
        assert!(result.is_overlap_error);
    }

    #[test]
    fn resize_inside_an_existing_overlap_still_stops_at_the_next_job() {
        // B already overlaps A on a loaded board; growing B must not run into C
        let jobs = vec![
            job("A", "D1", "09:00", 60),
            job("B", "D1", "09:30", 60),
            job("C", "D1", "11:00", 30),
        ];
        let result = compute_collision(proposal("D1", 570, 150, Some("B")), &jobs, &[], true);
        assert!(result.is_overlap_error);
        assert_eq!(result.adjusted_duration, 90);
    }

    #[test]
    fn resize_with_no_room_keeps_the_current_length() {
        let jobs = vec![
            job("A", "D1", "09:00", 30),
            job("B", "D1", "09:10", 20),
        ];
        let result = compute_collision(proposal("D1", 540, 60, Some("A")), &jobs, &[], true);
        assert!(result.is_overlap_error);
        assert_eq!(result.adjusted_duration, 30);
    }

    #[test]
    fn top_resize_clamps_to_the_previous_job_end() {
        let jobs = vec![job("A", "D1", "08:00", 60), job("B", "D1", "10:00", 60)];
        // B's end stays at 11:00; dragging the top up to 08:30 stops at 09:00
        let start = clamp_resize_start(proposal("D1", 510, 0, Some("B")), 660, &jobs, &[]);
        assert_eq!(start, 540);

        // Pulling the top down past the end keeps one slot
        let start = clamp_resize_start(proposal("D1", 675, 0, Some("B")), 660, &jobs, &[]);
        assert_eq!(start, 645);
    }

    #[test]
    fn top_resize_clamps_to_a_split_above() {
        let jobs = vec![job("A", "D1", "13:00", 60)];
        let splits = vec![split("S1", "D1", "12:00", "TruckB")];
        let start = clamp_resize_start(proposal("D1", 660, 0, Some("A")), 840, &jobs, &splits);
        assert_eq!(start, 720);
    }

    #[test]
    fn vehicle_follows_the_latest_split() {
        let drivers = vec![Driver::new("D", "Tanaka", "TruckA")];
        let splits = vec![split("S1", "D", "12:00", "TruckB")];

        assert!(check_vehicle_compatibility("D", 719, &splits, &drivers, Some("TruckB")));
        assert!(!check_vehicle_compatibility("D", 720, &splits, &drivers, Some("TruckB")));
        assert!(!check_vehicle_compatibility("D", 600, &splits, &drivers, Some("TruckA")));
        assert!(!check_vehicle_compatibility("D", 600, &splits, &drivers, None));
    }

    #[test]
    fn latest_of_several_splits_wins_regardless_of_order() {
        let drivers = vec![Driver::new("D", "Tanaka", "TruckA")];
        let splits = vec![
            split("S2", "D", "15:00", "TruckC"),
            split("S1", "D", "12:00", "TruckB"),
            split("S3", "E", "13:00", "TruckZ"),
        ];

        assert_eq!(effective_vehicle("D", 700, &splits, &drivers), Some("TruckA"));
        assert_eq!(effective_vehicle("D", 840, &splits, &drivers), Some("TruckB"));
        assert_eq!(effective_vehicle("D", 900, &splits, &drivers), Some("TruckC"));
        assert_eq!(effective_vehicle("X", 900, &splits, &drivers), None);
    }

    #[test]
    fn split_drop_conflicts() {
        let jobs = vec![job("A", "D1", "09:00", 60)];
        let splits = vec![split("S1", "D1", "12:00", "TruckB"), split("S2", "D1", "14:00", "TruckC")];

        assert!(check_split_collision("D1", 540, None, &jobs, &splits));
        assert!(check_split_collision("D1", 555, None, &jobs, &splits));
        assert!(!check_split_collision("D1", 600, None, &jobs, &splits));
        assert!(check_split_collision("D1", 720, Some("S2"), &jobs, &splits));
        assert!(!check_split_collision("D1", 720, Some("S1"), &jobs, &splits));
        assert!(!check_split_collision("D2", 720, None, &jobs, &splits));
    }

    #[test]
    fn finds_overlapping_pairs_per_column() {
        let jobs = vec![
            job("A", "D1", "09:00", 60),
            job("B", "D1", "09:30", 30),
            job("C", "D1", "10:00", 30),
            job("D", "D2", "09:30", 30),
        ];
        assert_eq!(find_overlaps(&jobs), vec![("A".to_string(), "B".to_string())]);
    }

    proptest! {
        #[test]
        fn clamped_resize_never_overlaps(
            start_slot in 0u32..20,
            gap_slots in 1u32..20,
            requested_slots in 1u32..40,
        ) {
            let start = 360 + start_slot * 15;
            let next = start + gap_slots * 15;
            let jobs = vec![
                Job::pending("A", "A", 15).scheduled("D1", crate::board::time::minutes_to_time(start)),
                Job::pending("B", "B", 30).scheduled("D1", crate::board::time::minutes_to_time(next)),
            ];

            let result = compute_collision(proposal("D1", start, requested_slots * 15, Some("A")), &jobs, &[], true);
            prop_assert!(!result.is_overlap_error);
            prop_assert!(result.adjusted_duration >= 15);
            prop_assert!(start + result.adjusted_duration <= next);
            prop_assert_eq!(result.adjusted_duration % 15, 0);
        }
    }
}
