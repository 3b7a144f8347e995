use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::BoardResult;
use super::time::time_to_minutes;

/// A driver column on the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub id: String,
    pub name: String,
    /// Vehicle at the start of the day; splits may hand the column over later
    pub current_vehicle: String,
    #[serde(default)]
    pub course: String,
    /// Display color as "#rrggbb" (empty = palette default)
    #[serde(default)]
    pub color: String,
}

impl Driver {
    pub fn new(id: impl Into<String>, name: impl Into<String>, vehicle: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            current_vehicle: vehicle.into(),
            course: String::new(),
            color: String::new(),
        }
    }
}

/// Coarse job category used for filtering; has no effect on scheduling
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Bucket {
    Am,
    Pm,
    Free,
    Custom(String),
}

impl From<String> for Bucket {
    fn from(label: String) -> Self {
        match label.as_str() {
            "AM" => Bucket::Am,
            "PM" => Bucket::Pm,
            "Free" => Bucket::Free,
            _ => Bucket::Custom(label),
        }
    }
}

impl From<Bucket> for String {
    fn from(bucket: Bucket) -> Self {
        bucket.to_string()
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bucket::Am => write!(f, "AM"),
            Bucket::Pm => write!(f, "PM"),
            Bucket::Free => write!(f, "Free"),
            Bucket::Custom(label) => write!(f, "{}", label),
        }
    }
}

/// A collection job. Lives in the pending pool while `driver_id`/`start_time` are unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub driver_id: Option<String>,
    /// "HH:MM"
    #[serde(default)]
    pub start_time: Option<String>,
    /// Minutes, a multiple of 15 and at least 15
    pub duration: u32,
    #[serde(default)]
    pub bucket: Option<Bucket>,
    #[serde(default)]
    pub required_vehicle: Option<String>,
    /// Derived on every placement, never authoritative
    #[serde(default)]
    pub is_vehicle_error: bool,
    #[serde(default)]
    pub note: Option<String>,
}

impl Job {
    /// New unscheduled job
    pub fn pending(id: impl Into<String>, title: impl Into<String>, duration: u32) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            driver_id: None,
            start_time: None,
            duration,
            bucket: None,
            required_vehicle: None,
            is_vehicle_error: false,
            note: None,
        }
    }

    pub fn with_bucket(mut self, bucket: Bucket) -> Self {
        self.bucket = Some(bucket);
        self
    }

    pub fn with_required_vehicle(mut self, vehicle: impl Into<String>) -> Self {
        self.required_vehicle = Some(vehicle.into());
        self
    }

    /// Place the job on a column (builder used by loaders and tests)
    pub fn scheduled(mut self, driver_id: impl Into<String>, start_time: impl Into<String>) -> Self {
        self.driver_id = Some(driver_id.into());
        self.start_time = Some(start_time.into());
        self
    }

    pub fn is_scheduled(&self) -> bool {
        self.driver_id.is_some() && self.start_time.is_some()
    }

    /// Start in minutes since midnight, `None` for pending jobs
    pub fn start_minutes(&self) -> BoardResult<Option<u32>> {
        self.start_time.as_deref().map(time_to_minutes).transpose()
    }

    /// Half-open [start, end) interval on the board, `None` for pending or unparsable jobs
    pub fn interval(&self) -> Option<(u32, u32)> {
        let start = self.start_minutes().ok()??;
        Some((start, start + self.duration))
    }

    /// Whether this job sits on `driver_id`'s column
    pub fn is_on(&self, driver_id: &str) -> bool {
        self.driver_id.as_deref() == Some(driver_id)
    }

    /// Strip the placement when the job goes back to the pending pool
    pub(crate) fn unschedule(&mut self) {
        self.driver_id = None;
        self.start_time = None;
        self.is_vehicle_error = false;
    }
}

/// A mid-day driver/vehicle handoff on a column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Split {
    pub id: String,
    pub driver_id: String,
    /// "HH:MM"; applies to everything at or after this time until the next split
    pub time: String,
    pub driver_name: String,
    pub vehicle: String,
}

impl Split {
    pub fn time_minutes(&self) -> BoardResult<u32> {
        time_to_minutes(&self.time)
    }
}

/// Everything on the board for one calendar date
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardState {
    #[serde(default)]
    pub drivers: Vec<Driver>,
    #[serde(default)]
    pub jobs: Vec<Job>,
    #[serde(default)]
    pub pending_jobs: Vec<Job>,
    #[serde(default)]
    pub splits: Vec<Split>,
}

impl BoardState {
    /// Empty board with the given driver columns
    pub fn with_roster(drivers: Vec<Driver>) -> Self {
        Self {
            drivers,
            ..Default::default()
        }
    }

    pub fn driver(&self, driver_id: &str) -> Option<&Driver> {
        self.drivers.iter().find(|d| d.id == driver_id)
    }

    pub fn job(&self, job_id: &str) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == job_id)
    }

    pub fn pending_job(&self, job_id: &str) -> Option<&Job> {
        self.pending_jobs.iter().find(|j| j.id == job_id)
    }

    pub fn split(&self, split_id: &str) -> Option<&Split> {
        self.splits.iter().find(|s| s.id == split_id)
    }

    /// Scheduled jobs on one column, sorted by start
    pub fn jobs_for_driver(&self, driver_id: &str) -> Vec<&Job> {
        let mut jobs: Vec<&Job> = self.jobs.iter().filter(|j| j.is_on(driver_id)).collect();
        jobs.sort_by_key(|j| j.interval().map(|(start, _)| start).unwrap_or(u32::MAX));
        jobs
    }

    /// Splits on one column, sorted by time
    pub fn splits_for_driver(&self, driver_id: &str) -> Vec<&Split> {
        let mut splits: Vec<&Split> = self.splits.iter().filter(|s| s.driver_id == driver_id).collect();
        splits.sort_by(|a, b| a.time.cmp(&b.time));
        splits
    }
}

/// Immutable copy of the board kept on the undo/redo stacks
pub type HistoryEntry = BoardState;
