//! Pointer-driven drag/resize state machine.
//!
//! One `DragState` at a time, so "dragging a job and a split at once" cannot be
//! represented. Events are handled synchronously in arrival order:
//!
//! ```text
//! Idle --down(job | pending job)--> DraggingJob  --up--> Idle  (commit if no overlap)
//! Idle --down(split)-------------> DraggingSplit --up--> Idle  (commit if no conflict)
//! Idle --down(resize handle)-----> Resizing      --up--> Idle  (always commits, clamped)
//! ```
//!
//! Moves only compute a `DropPreview`; nothing touches the board until release.
//! The shell must deliver the release from the window level, not the element,
//! or a release outside the board would leave the machine mid-drag.

use egui::{PointerButton, Pos2, Rect};
use tracing::{debug, warn};

use super::collision::{
    check_split_collision, check_vehicle_compatibility, clamp_resize_start, compute_collision, Proposal,
};
use super::model::BoardModel;
use super::time::{minutes_to_time, snap_to_slot, TimeWindow, SLOT_MINUTES};
use super::types::BoardState;

/// Screen rectangle of one driver column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnBounds {
    pub driver_id: String,
    pub rect: Rect,
}

/// Where the board was painted this frame, in screen coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct BoardGeometry {
    /// Screen y of the window start
    pub grid_top: f32,
    pub pixels_per_minute: f32,
    pub columns: Vec<ColumnBounds>,
}

impl Default for BoardGeometry {
    fn default() -> Self {
        Self {
            grid_top: 0.0,
            pixels_per_minute: 1.0,
            columns: Vec::new(),
        }
    }
}

impl BoardGeometry {
    /// Driver whose column spans this x coordinate
    pub fn column_at(&self, x: f32) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.rect.min.x <= x && x < c.rect.max.x)
            .map(|c| c.driver_id.as_str())
    }

    /// Vertical pointer delta as a whole number of slots, in minutes
    pub fn delta_minutes(&self, dy: f32) -> i64 {
        if self.pixels_per_minute <= 0.0 {
            return 0;
        }
        snap_to_slot((dy / self.pixels_per_minute).round() as i64)
    }

    /// Start of the slot under a screen y coordinate (not clamped)
    pub fn slot_at_y(&self, y: f32, window: &TimeWindow) -> i64 {
        if self.pixels_per_minute <= 0.0 {
            return window.start as i64;
        }
        let offset = ((y - self.grid_top) / self.pixels_per_minute).floor() as i64;
        window.start as i64 + offset.div_euclid(SLOT_MINUTES as i64) * SLOT_MINUTES as i64
    }

    pub fn y_for_minute(&self, minute: u32, window: &TimeWindow) -> f32 {
        self.grid_top + (minute as f32 - window.start as f32) * self.pixels_per_minute
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeEdge {
    Top,
    Bottom,
}

/// What the pointer went down on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragTarget {
    Job(String),
    PendingJob(String),
    ResizeHandle { job_id: String, edge: ResizeEdge },
    Split(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PointerEvent {
    Down {
        target: DragTarget,
        button: PointerButton,
        pos: Pos2,
    },
    Move {
        pos: Pos2,
    },
    Up {
        pos: Pos2,
    },
}

/// Projected placement for the job under the pointer. Read-only; never applied by itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropPreview {
    pub job_id: String,
    pub driver_id: String,
    pub start_min: u32,
    pub duration: u32,
    pub is_overlap_error: bool,
    pub is_vehicle_error: bool,
}

impl DropPreview {
    pub fn start_time(&self) -> String {
        minutes_to_time(self.start_min)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPreview {
    pub split_id: String,
    pub driver_id: String,
    pub time_min: u32,
    pub is_conflict: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragOrigin {
    Board,
    Pending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobDrag {
    pub job_id: String,
    pub origin: DragOrigin,
    press: Pos2,
    origin_driver: Option<String>,
    origin_start: Option<u32>,
    duration: u32,
    driver_id: Option<String>,
    pub preview: Option<DropPreview>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResizeDrag {
    pub job_id: String,
    pub edge: ResizeEdge,
    driver_id: String,
    origin_start: u32,
    origin_duration: u32,
    press_y: f32,
    pub preview: Option<DropPreview>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SplitDrag {
    pub split_id: String,
    press: Pos2,
    origin_driver: String,
    origin_time: u32,
    driver_id: String,
    pub preview: Option<SplitPreview>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum DragState {
    #[default]
    Idle,
    DraggingJob(JobDrag),
    DraggingSplit(SplitDrag),
    Resizing(ResizeDrag),
}

/// What a release changed on the board
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Commit {
    Moved(String),
    Assigned(String),
    Resized(String),
    SplitMoved(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragOutcome {
    /// Event did not apply to the current state
    Ignored,
    Started,
    Previewed,
    Committed(Commit),
    /// Released without changing the placement; the shell treats it as a click
    Unchanged(DragTarget),
    /// Released on a conflicting or empty target; nothing changed
    Discarded,
}

#[derive(Debug, Clone, Default)]
pub struct DragDropController {
    state: DragState,
    window: TimeWindow,
    /// Last pointer position seen during the gesture
    last_pos: Option<Pos2>,
}

impl DragDropController {
    pub fn new(window: TimeWindow) -> Self {
        Self {
            state: DragState::Idle,
            window,
            last_pos: None,
        }
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, DragState::Idle)
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    /// Current job preview (move or resize)
    pub fn preview(&self) -> Option<&DropPreview> {
        match &self.state {
            DragState::DraggingJob(drag) => drag.preview.as_ref(),
            DragState::Resizing(drag) => drag.preview.as_ref(),
            _ => None,
        }
    }

    pub fn split_preview(&self) -> Option<&SplitPreview> {
        match &self.state {
            DragState::DraggingSplit(drag) => drag.preview.as_ref(),
            _ => None,
        }
    }

    /// Id of the job or split being dragged, so the shell can hide it at its old spot
    pub fn active_id(&self) -> Option<&str> {
        match &self.state {
            DragState::Idle => None,
            DragState::DraggingJob(drag) => Some(&drag.job_id),
            DragState::DraggingSplit(drag) => Some(&drag.split_id),
            DragState::Resizing(drag) => Some(&drag.job_id),
        }
    }

    /// Drop the current gesture without touching the board. Used when the board
    /// is replaced or rewound under a drag; there is no user-facing cancel.
    pub fn cancel(&mut self) -> bool {
        if self.is_idle() {
            return false;
        }
        debug!(id = ?self.active_id(), "drag cancelled");
        self.state = DragState::Idle;
        self.last_pos = None;
        true
    }

    /// Feed one frame of window-level pointer input into the gesture.
    ///
    /// `pos` is `None` once the pointer has left the window. A release is then
    /// delivered at the last position seen, so it always ends the gesture.
    pub fn route(
        &mut self,
        pos: Option<Pos2>,
        moved: bool,
        released: bool,
        model: &mut BoardModel,
        geometry: &BoardGeometry,
    ) -> Option<DragOutcome> {
        if self.is_idle() {
            return None;
        }
        if let (true, Some(pos)) = (moved, pos) {
            self.handle(PointerEvent::Move { pos }, model, geometry);
        }
        if !released {
            return None;
        }
        let pos = pos.or(self.last_pos)?;
        Some(self.handle(PointerEvent::Up { pos }, model, geometry))
    }

    pub fn handle(&mut self, event: PointerEvent, model: &mut BoardModel, geometry: &BoardGeometry) -> DragOutcome {
        match event {
            PointerEvent::Down { target, button, pos } => self.pointer_down(target, button, pos, model.state()),
            PointerEvent::Move { pos } => self.pointer_move(pos, model.state(), geometry),
            PointerEvent::Up { pos } => self.pointer_up(pos, model, geometry),
        }
    }

    fn pointer_down(&mut self, target: DragTarget, button: PointerButton, pos: Pos2, board: &BoardState) -> DragOutcome {
        if button != PointerButton::Primary || !self.is_idle() {
            return DragOutcome::Ignored;
        }

        let next = match &target {
            DragTarget::Job(job_id) => board.job(job_id).and_then(|job| {
                let (start, _) = job.interval()?;
                Some(DragState::DraggingJob(JobDrag {
                    job_id: job_id.clone(),
                    origin: DragOrigin::Board,
                    press: pos,
                    origin_driver: job.driver_id.clone(),
                    origin_start: Some(start),
                    duration: job.duration,
                    driver_id: job.driver_id.clone(),
                    preview: None,
                }))
            }),
            DragTarget::PendingJob(job_id) => board.pending_job(job_id).map(|job| {
                DragState::DraggingJob(JobDrag {
                    job_id: job_id.clone(),
                    origin: DragOrigin::Pending,
                    press: pos,
                    origin_driver: None,
                    origin_start: None,
                    duration: job.duration,
                    driver_id: None,
                    preview: None,
                })
            }),
            DragTarget::ResizeHandle { job_id, edge } => board.job(job_id).and_then(|job| {
                let (start, _) = job.interval()?;
                Some(DragState::Resizing(ResizeDrag {
                    job_id: job_id.clone(),
                    edge: *edge,
                    driver_id: job.driver_id.clone()?,
                    origin_start: start,
                    origin_duration: job.duration,
                    press_y: pos.y,
                    preview: None,
                }))
            }),
            DragTarget::Split(split_id) => board.split(split_id).and_then(|split| {
                Some(DragState::DraggingSplit(SplitDrag {
                    split_id: split_id.clone(),
                    press: pos,
                    origin_driver: split.driver_id.clone(),
                    origin_time: split.time_minutes().ok()?,
                    driver_id: split.driver_id.clone(),
                    preview: None,
                }))
            }),
        };

        match next {
            Some(state) => {
                debug!(?target, "drag started");
                self.state = state;
                self.last_pos = Some(pos);
                DragOutcome::Started
            }
            None => DragOutcome::Ignored,
        }
    }

    fn pointer_move(&mut self, pos: Pos2, board: &BoardState, geometry: &BoardGeometry) -> DragOutcome {
        let window = self.window;
        match &mut self.state {
            DragState::Idle => return DragOutcome::Ignored,
            DragState::DraggingJob(drag) => drag.resolve(pos, board, geometry, &window),
            DragState::Resizing(drag) => drag.resolve(pos, board, geometry, &window),
            DragState::DraggingSplit(drag) => drag.resolve(pos, board, geometry, &window),
        }
        self.last_pos = Some(pos);
        DragOutcome::Previewed
    }

    fn pointer_up(&mut self, pos: Pos2, model: &mut BoardModel, geometry: &BoardGeometry) -> DragOutcome {
        let window = self.window;
        self.last_pos = None;
        // Drag state is cleared whatever happens below
        match std::mem::take(&mut self.state) {
            DragState::Idle => DragOutcome::Ignored,
            DragState::DraggingJob(mut drag) => {
                drag.resolve(pos, model.state(), geometry, &window);
                drag.finish(model)
            }
            DragState::Resizing(mut drag) => {
                drag.resolve(pos, model.state(), geometry, &window);
                drag.finish(model)
            }
            DragState::DraggingSplit(mut drag) => {
                drag.resolve(pos, model.state(), geometry, &window);
                drag.finish(model)
            }
        }
    }
}

impl JobDrag {
    fn resolve(&mut self, pos: Pos2, board: &BoardState, geometry: &BoardGeometry, window: &TimeWindow) {
        if let Some(driver_id) = geometry.column_at(pos.x) {
            self.driver_id = Some(driver_id.to_string());
        }
        let Some(driver_id) = self.driver_id.clone() else {
            self.preview = None;
            return;
        };

        let candidate = match self.origin_start {
            Some(origin_start) => origin_start as i64 + geometry.delta_minutes(pos.y - self.press.y),
            None => geometry.slot_at_y(pos.y, window),
        };
        let start_min = window.clamp_start(candidate);

        let collision = compute_collision(
            Proposal {
                driver_id: &driver_id,
                start_min,
                duration: self.duration,
                ignore_job_id: Some(&self.job_id),
            },
            &board.jobs,
            &board.splits,
            false,
        );
        let required = board
            .job(&self.job_id)
            .or_else(|| board.pending_job(&self.job_id))
            .and_then(|job| job.required_vehicle.as_deref());

        self.preview = Some(DropPreview {
            job_id: self.job_id.clone(),
            is_vehicle_error: check_vehicle_compatibility(&driver_id, start_min, &board.splits, &board.drivers, required),
            driver_id,
            start_min,
            duration: self.duration,
            is_overlap_error: collision.is_overlap_error,
        });
    }

    fn finish(self, model: &mut BoardModel) -> DragOutcome {
        let Some(preview) = self.preview else {
            return match self.origin {
                DragOrigin::Pending => DragOutcome::Unchanged(DragTarget::PendingJob(self.job_id)),
                DragOrigin::Board => DragOutcome::Discarded,
            };
        };

        if self.origin == DragOrigin::Board
            && self.origin_driver.as_deref() == Some(preview.driver_id.as_str())
            && self.origin_start == Some(preview.start_min)
        {
            return DragOutcome::Unchanged(DragTarget::Job(self.job_id));
        }

        if preview.is_overlap_error {
            debug!(job = %self.job_id, driver = %preview.driver_id, start = %preview.start_time(), "drop rejected: overlap");
            return DragOutcome::Discarded;
        }

        let start_time = preview.start_time();
        let result = match self.origin {
            DragOrigin::Board => model
                .move_job(&self.job_id, &preview.driver_id, &start_time, preview.duration)
                .map(|_| Commit::Moved(self.job_id.clone())),
            DragOrigin::Pending => model
                .assign_pending_job(&self.job_id, &preview.driver_id, &start_time)
                .map(|_| Commit::Assigned(self.job_id.clone())),
        };

        match result {
            Ok(commit) => DragOutcome::Committed(commit),
            Err(err) => {
                // The board changed under the drag (e.g. a remote replace)
                warn!(job = %self.job_id, %err, "drop could not be applied");
                DragOutcome::Discarded
            }
        }
    }
}

impl ResizeDrag {
    fn resolve(&mut self, pos: Pos2, board: &BoardState, geometry: &BoardGeometry, window: &TimeWindow) {
        let delta = geometry.delta_minutes(pos.y - self.press_y);
        let end = self.origin_start + self.origin_duration;
        let slot = SLOT_MINUTES as i64;

        let (start_min, duration, is_overlap_error) = match self.edge {
            ResizeEdge::Bottom => {
                let max_duration = window.end.saturating_sub(self.origin_start).max(SLOT_MINUTES) as i64;
                let requested = (self.origin_duration as i64 + delta).clamp(slot, max_duration) as u32;
                let collision = compute_collision(
                    Proposal {
                        driver_id: &self.driver_id,
                        start_min: self.origin_start,
                        duration: requested,
                        ignore_job_id: Some(&self.job_id),
                    },
                    &board.jobs,
                    &board.splits,
                    true,
                );
                (self.origin_start, collision.adjusted_duration, collision.is_overlap_error)
            }
            ResizeEdge::Top => {
                // End stays fixed; the start may not pass end - 15
                let requested = (self.origin_start as i64 + delta).max(window.start as i64);
                let requested = requested.min(end as i64 - slot).max(0) as u32;
                let start = clamp_resize_start(
                    Proposal {
                        driver_id: &self.driver_id,
                        start_min: requested,
                        duration: end.saturating_sub(requested),
                        ignore_job_id: Some(&self.job_id),
                    },
                    end,
                    &board.jobs,
                    &board.splits,
                );
                (start, end - start, false)
            }
        };

        let required = board.job(&self.job_id).and_then(|job| job.required_vehicle.as_deref());
        self.preview = Some(DropPreview {
            job_id: self.job_id.clone(),
            driver_id: self.driver_id.clone(),
            start_min,
            duration,
            is_overlap_error,
            is_vehicle_error: check_vehicle_compatibility(&self.driver_id, start_min, &board.splits, &board.drivers, required),
        });
    }

    /// Resizes always commit with the clamped values
    fn finish(self, model: &mut BoardModel) -> DragOutcome {
        let (start_min, duration) = match &self.preview {
            Some(preview) => (preview.start_min, preview.duration),
            None => (self.origin_start, self.origin_duration),
        };

        match model.resize_job(&self.job_id, &minutes_to_time(start_min), duration) {
            Ok(()) => DragOutcome::Committed(Commit::Resized(self.job_id)),
            Err(err) => {
                warn!(job = %self.job_id, %err, "resize could not be applied");
                DragOutcome::Discarded
            }
        }
    }
}

impl SplitDrag {
    fn resolve(&mut self, pos: Pos2, board: &BoardState, geometry: &BoardGeometry, window: &TimeWindow) {
        if let Some(driver_id) = geometry.column_at(pos.x) {
            self.driver_id = driver_id.to_string();
        }
        let time_min = window.clamp_start(self.origin_time as i64 + geometry.delta_minutes(pos.y - self.press.y));

        self.preview = Some(SplitPreview {
            split_id: self.split_id.clone(),
            driver_id: self.driver_id.clone(),
            time_min,
            is_conflict: check_split_collision(&self.driver_id, time_min, Some(&self.split_id), &board.jobs, &board.splits),
        });
    }

    fn finish(self, model: &mut BoardModel) -> DragOutcome {
        let Some(preview) = self.preview else {
            return DragOutcome::Unchanged(DragTarget::Split(self.split_id));
        };

        if preview.driver_id == self.origin_driver && preview.time_min == self.origin_time {
            return DragOutcome::Unchanged(DragTarget::Split(self.split_id));
        }
        if preview.is_conflict {
            debug!(split = %self.split_id, "split drop rejected: conflict");
            return DragOutcome::Discarded;
        }

        match model.move_split(&self.split_id, &preview.driver_id, &minutes_to_time(preview.time_min)) {
            Ok(()) => DragOutcome::Committed(Commit::SplitMoved(self.split_id)),
            Err(err) => {
                warn!(split = %self.split_id, %err, "split drop could not be applied");
                DragOutcome::Discarded
            }
        }
    }
}
