//! Scheduling core: pure state and rules, no rendering and no I/O.

mod collision;
mod colors;
mod drag;
mod error;
mod history;
mod model;
mod time;
mod types;

pub use collision::{
    check_split_collision, check_vehicle_compatibility, clamp_resize_start, compute_collision, effective_vehicle,
    find_overlaps, CollisionResult, Proposal,
};
pub use colors::{color_map, ColorSlot, PALETTE_SIZE};
pub use drag::{
    BoardGeometry, ColumnBounds, Commit, DragDropController, DragOrigin, DragOutcome, DragState, DragTarget,
    DropPreview, PointerEvent, ResizeEdge, SplitPreview,
};
pub use error::{BoardError, BoardResult};
pub use history::{shortcut_action, HistoryAction, HistoryManager, DEFAULT_HISTORY_LIMIT};
pub use model::{BoardModel, JobDetails};
pub use time::{
    floor_to_slot, format_duration, minutes_to_time, snap_to_slot, time_to_minutes, TimeWindow, DAY_END_MINUTES,
    DAY_START_MINUTES, LAST_START_MINUTES, SLOT_MINUTES,
};
pub use types::{BoardState, Bucket, Driver, HistoryEntry, Job, Split};
