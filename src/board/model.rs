//! The board aggregate: owns the canonical state and applies mutations.
//!
//! Every mutation validates ids first, then records history, then mutates.
//! Overlap is NOT re-checked here; the drag controller consults the collision
//! engine before calling in.

use tracing::{debug, info};

use super::collision::check_vehicle_compatibility;
use super::error::{BoardError, BoardResult};
use super::history::{HistoryAction, HistoryManager};
use super::time::{floor_to_slot, time_to_minutes, SLOT_MINUTES};
use super::types::{BoardState, Bucket, Driver, Job, Split};

/// Editable fields of a job that are not part of its placement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobDetails {
    pub title: String,
    pub note: Option<String>,
    pub bucket: Option<Bucket>,
    pub required_vehicle: Option<String>,
}

impl From<&Job> for JobDetails {
    fn from(job: &Job) -> Self {
        Self {
            title: job.title.clone(),
            note: job.note.clone(),
            bucket: job.bucket.clone(),
            required_vehicle: job.required_vehicle.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BoardModel {
    state: BoardState,
    history: HistoryManager,
}

impl BoardModel {
    pub fn new(state: BoardState) -> Self {
        Self::with_history_limit(state, super::history::DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_history_limit(state: BoardState, history_limit: usize) -> Self {
        Self {
            state,
            history: HistoryManager::new(history_limit),
        }
    }

    /// Read-only view of the canonical state
    pub fn state(&self) -> &BoardState {
        &self.state
    }

    /// Owned copy for the persistence collaborator
    pub fn snapshot(&self) -> BoardState {
        self.state.clone()
    }

    /// Realtime merge: the incoming state wins wholesale and history is dropped,
    /// since undoing past a remote overwrite would resurrect stale data.
    pub fn replace_state(&mut self, state: BoardState) {
        info!(
            jobs = state.jobs.len(),
            pending = state.pending_jobs.len(),
            "board state replaced"
        );
        self.state = state;
        self.history.clear();
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self) -> bool {
        self.history.undo(&mut self.state)
    }

    pub fn redo(&mut self) -> bool {
        self.history.redo(&mut self.state)
    }

    pub fn apply_history(&mut self, action: HistoryAction) -> bool {
        match action {
            HistoryAction::Undo => self.undo(),
            HistoryAction::Redo => self.redo(),
        }
    }

    fn require_driver(&self, driver_id: &str) -> BoardResult<()> {
        self.state
            .driver(driver_id)
            .map(|_| ())
            .ok_or_else(|| BoardError::UnknownDriver(driver_id.to_string()))
    }

    fn scheduled_index(&self, job_id: &str) -> BoardResult<usize> {
        self.state
            .jobs
            .iter()
            .position(|j| j.id == job_id)
            .ok_or_else(|| BoardError::UnknownJob(job_id.to_string()))
    }

    fn pending_index(&self, job_id: &str) -> BoardResult<usize> {
        self.state
            .pending_jobs
            .iter()
            .position(|j| j.id == job_id)
            .ok_or_else(|| BoardError::UnknownJob(job_id.to_string()))
    }

    fn split_index(&self, split_id: &str) -> BoardResult<usize> {
        self.state
            .splits
            .iter()
            .position(|s| s.id == split_id)
            .ok_or_else(|| BoardError::UnknownSplit(split_id.to_string()))
    }

    /// The single place a job's vehicle flag is derived
    fn vehicle_flag(&self, job: &Job, driver_id: &str, start_min: u32) -> bool {
        check_vehicle_compatibility(
            driver_id,
            start_min,
            &self.state.splits,
            &self.state.drivers,
            job.required_vehicle.as_deref(),
        )
    }

    /// Recompute vehicle flags for every job on the given columns after a split change
    fn refresh_vehicle_flags(&mut self, driver_ids: &[&str]) {
        let flags: Vec<(usize, bool)> = self
            .state
            .jobs
            .iter()
            .enumerate()
            .filter_map(|(idx, job)| {
                let driver_id = job.driver_id.as_deref()?;
                if !driver_ids.contains(&driver_id) {
                    return None;
                }
                let (start, _) = job.interval()?;
                Some((idx, self.vehicle_flag(job, driver_id, start)))
            })
            .collect();

        for (idx, flag) in flags {
            self.state.jobs[idx].is_vehicle_error = flag;
        }
    }

    /// Schedule a pending job at `driver_id` / `start_time`.
    ///
    /// Any job occupying that cell (its interval covers the target start) goes
    /// back to the pending pool, with its bucket defaulted to "Free" if unset.
    /// Assignment therefore always succeeds by displacement.
    pub fn assign_pending_job(&mut self, job_id: &str, driver_id: &str, start_time: &str) -> BoardResult<()> {
        let pending_idx = self.pending_index(job_id)?;
        self.require_driver(driver_id)?;
        let start_min = time_to_minutes(start_time)?;

        self.history.record(&self.state);

        let mut job = self.state.pending_jobs.remove(pending_idx);
        job.is_vehicle_error = self.vehicle_flag(&job, driver_id, start_min);
        job.driver_id = Some(driver_id.to_string());
        job.start_time = Some(start_time.to_string());

        let (evicted, kept): (Vec<Job>, Vec<Job>) = std::mem::take(&mut self.state.jobs)
            .into_iter()
            .partition(|other| {
                other.is_on(driver_id)
                    && other
                        .interval()
                        .map(|(s, e)| s <= start_min && start_min < e)
                        .unwrap_or(false)
            });
        self.state.jobs = kept;

        for mut displaced in evicted {
            info!(job = %displaced.id, by = %job.id, "job displaced back to pending");
            displaced.unschedule();
            displaced.bucket.get_or_insert(Bucket::Free);
            self.state.pending_jobs.push(displaced);
        }

        debug!(job = %job.id, driver = driver_id, start = start_time, "job assigned");
        self.state.jobs.push(job);
        Ok(())
    }

    /// Unschedule a job: it returns to the pending pool, it is never hard-deleted
    pub fn delete_job(&mut self, job_id: &str) -> BoardResult<()> {
        let idx = self.scheduled_index(job_id)?;
        self.history.record(&self.state);

        let mut job = self.state.jobs.remove(idx);
        job.unschedule();
        debug!(job = %job.id, "job unscheduled");
        self.state.pending_jobs.push(job);
        Ok(())
    }

    /// Move a scheduled job to another column/time; duration may change with it
    pub fn move_job(&mut self, job_id: &str, driver_id: &str, start_time: &str, duration: u32) -> BoardResult<()> {
        let idx = self.scheduled_index(job_id)?;
        self.require_driver(driver_id)?;
        let start_min = time_to_minutes(start_time)?;

        self.history.record(&self.state);

        let flag = self.vehicle_flag(&self.state.jobs[idx], driver_id, start_min);
        let job = &mut self.state.jobs[idx];
        job.driver_id = Some(driver_id.to_string());
        job.start_time = Some(start_time.to_string());
        job.duration = normalize_duration(duration);
        job.is_vehicle_error = flag;
        debug!(job = job_id, driver = driver_id, start = start_time, "job moved");
        Ok(())
    }

    /// Change a scheduled job's start and/or duration on its current column
    pub fn resize_job(&mut self, job_id: &str, start_time: &str, duration: u32) -> BoardResult<()> {
        let idx = self.scheduled_index(job_id)?;
        let start_min = time_to_minutes(start_time)?;

        self.history.record(&self.state);

        let job = &self.state.jobs[idx];
        let flag = match job.driver_id.as_deref() {
            Some(driver_id) => self.vehicle_flag(job, driver_id, start_min),
            None => false,
        };
        let job = &mut self.state.jobs[idx];
        job.start_time = Some(start_time.to_string());
        job.duration = normalize_duration(duration);
        job.is_vehicle_error = flag;
        debug!(job = job_id, start = start_time, duration = job.duration, "job resized");
        Ok(())
    }

    /// Insert or update a split. A split at the same column/time as another one replaces it.
    pub fn upsert_split(&mut self, split: Split) -> BoardResult<()> {
        self.require_driver(&split.driver_id)?;
        let time = split.time_minutes()?;

        self.history.record(&self.state);

        let mut touched = vec![split.driver_id.clone()];
        if let Some(previous) = self.state.splits.iter().find(|s| s.id == split.id) {
            touched.push(previous.driver_id.clone());
        }
        self.state.splits.retain(|s| {
            s.id != split.id && !(s.driver_id == split.driver_id && s.time_minutes().ok() == Some(time))
        });

        debug!(split = %split.id, driver = %split.driver_id, time = %split.time, "split saved");
        self.state.splits.push(split);
        self.sort_splits();

        let touched: Vec<&str> = touched.iter().map(String::as_str).collect();
        self.refresh_vehicle_flags(&touched);
        Ok(())
    }

    /// Move a split to another column/time (pre-validated by the drag controller)
    pub fn move_split(&mut self, split_id: &str, driver_id: &str, time: &str) -> BoardResult<()> {
        let idx = self.split_index(split_id)?;
        self.require_driver(driver_id)?;
        time_to_minutes(time)?;

        self.history.record(&self.state);

        let split = &mut self.state.splits[idx];
        let previous_driver = std::mem::replace(&mut split.driver_id, driver_id.to_string());
        split.time = time.to_string();
        self.sort_splits();
        debug!(split = split_id, driver = driver_id, time, "split moved");

        self.refresh_vehicle_flags(&[previous_driver.as_str(), driver_id]);
        Ok(())
    }

    pub fn delete_split(&mut self, split_id: &str) -> BoardResult<()> {
        let idx = self.split_index(split_id)?;
        self.history.record(&self.state);

        let split = self.state.splits.remove(idx);
        debug!(split = split_id, "split deleted");
        self.refresh_vehicle_flags(&[split.driver_id.as_str()]);
        Ok(())
    }

    /// Add a new job to the pending pool
    pub fn add_pending_job(&mut self, mut job: Job) {
        self.history.record(&self.state);
        job.unschedule();
        job.duration = normalize_duration(job.duration);
        debug!(job = %job.id, "pending job added");
        self.state.pending_jobs.push(job);
    }

    /// Drop a job from the pending pool for good (the only hard delete)
    pub fn remove_pending_job(&mut self, job_id: &str) -> BoardResult<Job> {
        let idx = self.pending_index(job_id)?;
        self.history.record(&self.state);
        Ok(self.state.pending_jobs.remove(idx))
    }

    /// Edit title, note, bucket and required vehicle of a scheduled or pending job
    pub fn update_job_details(&mut self, job_id: &str, details: JobDetails) -> BoardResult<()> {
        let scheduled = self.state.jobs.iter().position(|j| j.id == job_id);
        let pending = self.state.pending_jobs.iter().position(|j| j.id == job_id);
        if scheduled.is_none() && pending.is_none() {
            return Err(BoardError::UnknownJob(job_id.to_string()));
        }

        self.history.record(&self.state);

        let job = match (scheduled, pending) {
            (Some(idx), _) => &mut self.state.jobs[idx],
            (None, Some(idx)) => &mut self.state.pending_jobs[idx],
            (None, None) => return Err(BoardError::UnknownJob(job_id.to_string())),
        };
        job.title = details.title;
        job.note = details.note.filter(|n| !n.trim().is_empty());
        job.bucket = details.bucket;
        job.required_vehicle = details.required_vehicle.filter(|v| !v.trim().is_empty());

        if let Some(idx) = scheduled {
            if let Some(driver_id) = self.state.jobs[idx].driver_id.clone() {
                self.refresh_vehicle_flags(&[driver_id.as_str()]);
            }
        }
        Ok(())
    }

    /// Move a driver column to `new_index` (clamped to the roster length)
    pub fn reorder_driver(&mut self, driver_id: &str, new_index: usize) -> BoardResult<()> {
        let idx = self
            .state
            .drivers
            .iter()
            .position(|d| d.id == driver_id)
            .ok_or_else(|| BoardError::UnknownDriver(driver_id.to_string()))?;

        self.history.record(&self.state);

        let driver: Driver = self.state.drivers.remove(idx);
        let new_index = new_index.min(self.state.drivers.len());
        self.state.drivers.insert(new_index, driver);
        Ok(())
    }

    fn sort_splits(&mut self) {
        self.state
            .splits
            .sort_by(|a, b| a.driver_id.cmp(&b.driver_id).then_with(|| a.time.cmp(&b.time)));
    }
}

/// Durations are whole slots and at least one slot
fn normalize_duration(duration: u32) -> u32 {
    floor_to_slot(duration).max(SLOT_MINUTES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn roster() -> Vec<Driver> {
        vec![
            Driver::new("D1", "Sato", "2025PK"),
            Driver::new("D2", "Ito", "TruckA"),
        ]
    }

    fn model_with_pending(jobs: Vec<Job>) -> BoardModel {
        BoardModel::new(BoardState {
            pending_jobs: jobs,
            ..BoardState::with_roster(roster())
        })
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

    #[test]
    fn assign_moves_job_from_pending_to_board() {
        let mut model = model_with_pending(vec![Job::pending("J1", "Bins", 30).with_bucket(Bucket::Am)]);
        model.assign_pending_job("J1", "D1", "09:00").unwrap();

        let state = model.state();
        assert!(state.pending_jobs.is_empty());
        assert_eq!(state.jobs.len(), 1);
        assert_eq!(state.jobs[0].driver_id.as_deref(), Some("D1"));
        assert_eq!(state.jobs[0].start_time.as_deref(), Some("09:00"));
        assert_eq!(state.jobs[0].bucket, Some(Bucket::Am));
    }

    #[test]
    fn undo_redo_after_assignment_restores_exact_state() {
        let mut model = model_with_pending(vec![Job::pending("J1", "Bins", 30)]);
        let before = model.snapshot();

        model.assign_pending_job("J1", "D1", "09:00").unwrap();
        let after = model.snapshot();

        assert!(model.undo());
        assert_eq!(model.state(), &before);
        assert!(model.redo());
        assert_eq!(model.state(), &after);
    }

    #[test]
    fn double_assign_displaces_the_occupant() {
        let mut model = model_with_pending(vec![Job::pending("X", "X", 30), Job::pending("Y", "Y", 30)]);
        model.assign_pending_job("Y", "D1", "09:00").unwrap();
        model.assign_pending_job("X", "D1", "09:00").unwrap();

        let state = model.state();
        let at_cell: Vec<&str> = state
            .jobs_for_driver("D1")
            .iter()
            .filter(|j| j.start_time.as_deref() == Some("09:00"))
            .map(|j| j.id.as_str())
            .collect();
        assert_eq!(at_cell, vec!["X"]);

        let displaced = state.pending_job("Y").unwrap();
        assert_eq!(displaced.bucket, Some(Bucket::Free));
        assert_eq!(displaced.driver_id, None);
        assert_eq!(displaced.start_time, None);
    }

    #[test]
    fn displacement_keeps_an_existing_bucket() {
        let mut model = model_with_pending(vec![
            Job::pending("X", "X", 30),
            Job::pending("Y", "Y", 60).with_bucket(Bucket::Pm),
        ]);
        model.assign_pending_job("Y", "D1", "09:00").unwrap();
        // 09:30 lies inside Y's 09:00-10:00 block
        model.assign_pending_job("X", "D1", "09:30").unwrap();

        assert_eq!(model.state().pending_job("Y").unwrap().bucket, Some(Bucket::Pm));
    }

    #[test]
    fn assignment_flags_vehicle_mismatch() {
        let mut model = model_with_pending(vec![Job::pending("J1", "Bins", 30).with_required_vehicle("TruckA")]);
        model.assign_pending_job("J1", "D1", "09:00").unwrap();
        assert!(model.state().jobs[0].is_vehicle_error);

        model.move_job("J1", "D2", "09:00", 30).unwrap();
        assert!(!model.state().jobs[0].is_vehicle_error);
    }

    #[test]
    fn unknown_ids_are_rejected_without_recording_history() {
        let mut model = model_with_pending(vec![Job::pending("J1", "Bins", 30)]);

        assert_eq!(
            model.assign_pending_job("nope", "D1", "09:00"),
            Err(BoardError::UnknownJob("nope".to_string()))
        );
        assert_eq!(
            model.assign_pending_job("J1", "D9", "09:00"),
            Err(BoardError::UnknownDriver("D9".to_string()))
        );
        assert_eq!(
            model.assign_pending_job("J1", "D1", "9:00"),
            Err(BoardError::InvalidTimeFormat("9:00".to_string()))
        );
        assert_eq!(model.delete_split("S1"), Err(BoardError::UnknownSplit("S1".to_string())));
        assert!(!model.can_undo());
    }

    #[test]
    fn delete_unschedules_instead_of_removing() {
        let mut model = model_with_pending(vec![Job::pending("J1", "Bins", 30).with_required_vehicle("TruckA")]);
        model.assign_pending_job("J1", "D1", "09:00").unwrap();
        model.delete_job("J1").unwrap();

        let state = model.state();
        assert!(state.jobs.is_empty());
        let job = state.pending_job("J1").unwrap();
        assert!(!job.is_scheduled());
        assert!(!job.is_vehicle_error);
    }

    #[test]
    fn resize_changes_start_and_duration() {
        let mut model = model_with_pending(vec![Job::pending("J1", "Bins", 30)]);
        model.assign_pending_job("J1", "D1", "09:00").unwrap();
        model.resize_job("J1", "08:30", 60).unwrap();

        let job = model.state().job("J1").unwrap();
        assert_eq!(job.start_time.as_deref(), Some("08:30"));
        assert_eq!(job.duration, 60);

        // Below one slot is pinned to one slot
        model.resize_job("J1", "08:30", 5).unwrap();
        assert_eq!(model.state().job("J1").unwrap().duration, 15);
    }

    #[test]
    fn split_changes_refresh_vehicle_flags() {
        let mut model = model_with_pending(vec![Job::pending("J1", "Bins", 30).with_required_vehicle("TruckB")]);
        model.assign_pending_job("J1", "D1", "13:00").unwrap();
        assert!(model.state().jobs[0].is_vehicle_error);

        model.upsert_split(split("S1", "D1", "12:00", "TruckB")).unwrap();
        assert!(!model.state().jobs[0].is_vehicle_error);

        model.move_split("S1", "D2", "12:00").unwrap();
        assert!(model.state().jobs[0].is_vehicle_error);

        model.move_split("S1", "D1", "12:30").unwrap();
        assert!(!model.state().jobs[0].is_vehicle_error);

        model.delete_split("S1").unwrap();
        assert!(model.state().jobs[0].is_vehicle_error);
    }

    #[test]
    fn upsert_keeps_one_split_per_column_and_time() {
        let mut model = model_with_pending(vec![]);
        model.upsert_split(split("S1", "D1", "12:00", "TruckB")).unwrap();
        model.upsert_split(split("S2", "D1", "12:00", "TruckC")).unwrap();
        model.upsert_split(split("S3", "D1", "10:00", "TruckD")).unwrap();

        let splits = &model.state().splits;
        assert_eq!(splits.len(), 2);
        assert_eq!(splits[0].id, "S3");
        assert_eq!(splits[1].id, "S2");

        // Same id updates in place
        model.upsert_split(split("S3", "D1", "10:00", "TruckE")).unwrap();
        assert_eq!(model.state().split("S3").unwrap().vehicle, "TruckE");
        assert_eq!(model.state().splits.len(), 2);
    }

    #[test]
    fn pending_pool_maintenance() {
        let mut model = model_with_pending(vec![]);
        model.add_pending_job(Job::pending("J1", "Bins", 40).scheduled("D1", "09:00"));

        let job = model.state().pending_job("J1").unwrap();
        assert!(!job.is_scheduled());
        assert_eq!(job.duration, 30);

        let removed = model.remove_pending_job("J1").unwrap();
        assert_eq!(removed.id, "J1");
        assert!(model.state().pending_jobs.is_empty());

        model.undo();
        assert!(model.state().pending_job("J1").is_some());
    }

    #[test]
    fn details_update_recomputes_vehicle_flag() {
        let mut model = model_with_pending(vec![Job::pending("J1", "Bins", 30)]);
        model.assign_pending_job("J1", "D1", "09:00").unwrap();

        let mut details = JobDetails::from(model.state().job("J1").unwrap());
        details.title = "Bins (north)".to_string();
        details.required_vehicle = Some("TruckZ".to_string());
        details.note = Some("   ".to_string());
        model.update_job_details("J1", details).unwrap();

        let job = model.state().job("J1").unwrap();
        assert_eq!(job.title, "Bins (north)");
        assert_eq!(job.note, None);
        assert!(job.is_vehicle_error);
    }

    #[test]
    fn reorder_moves_columns() {
        let mut model = model_with_pending(vec![]);
        model.reorder_driver("D2", 0).unwrap();
        let ids: Vec<&str> = model.state().drivers.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["D2", "D1"]);

        model.reorder_driver("D2", 99).unwrap();
        assert_eq!(model.state().drivers[1].id, "D2");
    }

    #[test]
    fn replace_state_wins_and_clears_history() {
        let mut model = model_with_pending(vec![Job::pending("J1", "Bins", 30)]);
        model.assign_pending_job("J1", "D1", "09:00").unwrap();

        let remote = BoardState::with_roster(vec![Driver::new("D7", "Kato", "Van")]);
        model.replace_state(remote.clone());

        assert_eq!(model.state(), &remote);
        assert!(!model.can_undo());
        assert!(!model.undo());
    }
}
