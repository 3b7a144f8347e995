use egui::{Color32, CursorIcon, PointerButton, Pos2, Rect, Stroke, Ui};

use crate::board::{
    color_map, effective_vehicle, format_duration, minutes_to_time, BoardGeometry, BoardState, ColorSlot,
    ColumnBounds, DragDropController, DragState, DragTarget, Job, ResizeEdge, TimeWindow, PALETTE_SIZE,
};
use super::theme::{accent_color, error_color, job_colors, parse_hex_color, phosphor_fill_family, warning_color};

const TIME_LABEL_WIDTH: f32 = 56.0;
const HEADER_HEIGHT: f32 = 52.0;
const BLOCK_MARGIN: f32 = 3.0;
/// Pixels from a block edge that grab the resize handle
const EDGE_THRESHOLD: f32 = 6.0;
/// Half-height of the grab band around a split line
const SPLIT_GRAB: f32 = 5.0;

/// Size and window of the grid, from config
#[derive(Debug, Clone, Copy)]
pub struct BoardLayout {
    pub window: TimeWindow,
    pub pixels_per_minute: f32,
    pub column_width: f32,
}

/// What happened on the board this frame
#[derive(Default)]
pub struct BoardViewResult {
    /// Pointer went down on a job, handle or split
    pub pressed: Option<(DragTarget, PointerButton, Pos2)>,
    /// Where everything was painted, for hit-testing pointer moves next frame
    pub geometry: BoardGeometry,
    /// Empty cell clicked: (driver id, slot start)
    pub clicked_cell: Option<(String, u32)>,
    /// Header arrow clicked: (driver id, new index)
    pub reorder: Option<(String, usize)>,
}

pub fn render_board(
    ui: &mut Ui,
    state: &BoardState,
    controller: &DragDropController,
    selected_cell: Option<&(String, u32)>,
    layout: &BoardLayout,
) -> BoardViewResult {
    let mut result = BoardViewResult::default();

    if state.drivers.is_empty() {
        ui.centered_and_justified(|ui| {
            ui.label(egui::RichText::new("No drivers on this board").color(Color32::from_rgb(112, 112, 104)));
        });
        return result;
    }

    let window = layout.window;
    let ppm = layout.pixels_per_minute;
    let grid_height = window.span() as f32 * ppm;
    let total_width = TIME_LABEL_WIDTH + layout.column_width * state.drivers.len() as f32;

    egui::ScrollArea::both().auto_shrink([false, false]).show(ui, |ui| {
        let (board_rect, _) = ui.allocate_exact_size(
            egui::vec2(total_width, HEADER_HEIGHT + grid_height),
            egui::Sense::hover(),
        );
        let grid_top = board_rect.min.y + HEADER_HEIGHT;

        let columns: Vec<ColumnBounds> = state
            .drivers
            .iter()
            .enumerate()
            .map(|(i, driver)| ColumnBounds {
                driver_id: driver.id.clone(),
                rect: Rect::from_min_size(
                    egui::pos2(board_rect.min.x + TIME_LABEL_WIDTH + i as f32 * layout.column_width, grid_top),
                    egui::vec2(layout.column_width, grid_height),
                ),
            })
            .collect();
        let geometry = BoardGeometry {
            grid_top,
            pixels_per_minute: ppm,
            columns,
        };

        paint_time_axis(ui, board_rect, &geometry, &window);
        result.reorder = render_headers(ui, board_rect, state, &geometry, &window);

        if let Some((driver_id, minute)) = selected_cell {
            if let Some(column) = geometry.columns.iter().find(|c| &c.driver_id == driver_id) {
                let y = geometry.y_for_minute(*minute, &window);
                let cell = Rect::from_min_size(
                    egui::pos2(column.rect.min.x, y),
                    egui::vec2(column.rect.width(), 15.0 * ppm),
                );
                let accent = accent_color();
                ui.painter().rect(
                    cell,
                    2.0,
                    Color32::from_rgba_unmultiplied(accent.r(), accent.g(), accent.b(), 40),
                    Stroke::new(1.0, accent),
                );
            }
        }

        // Hit targets in priority order: splits, resize handles, then blocks
        let mut targets: Vec<(Rect, DragTarget, CursorIcon)> = Vec::new();
        let mut block_rects: Vec<(Rect, DragTarget, CursorIcon)> = Vec::new();
        let colors = color_map(state);
        let active_id = controller.active_id();

        for column in &geometry.columns {
            for job in state.jobs_for_driver(&column.driver_id) {
                let Some((start, end)) = job.interval() else {
                    continue;
                };
                let block = block_rect(&geometry, &window, column.rect, start, end);
                let slot = colors.get(&job.id).copied().unwrap_or(ColorSlot {
                    palette_index: 0,
                    alternate: false,
                });
                paint_job(ui, block, job, slot, active_id == Some(job.id.as_str()));

                let top = Rect::from_min_max(block.min, egui::pos2(block.max.x, block.min.y + EDGE_THRESHOLD));
                let bottom = Rect::from_min_max(egui::pos2(block.min.x, block.max.y - EDGE_THRESHOLD), block.max);
                targets.push((
                    top,
                    DragTarget::ResizeHandle {
                        job_id: job.id.clone(),
                        edge: ResizeEdge::Top,
                    },
                    CursorIcon::ResizeVertical,
                ));
                targets.push((
                    bottom,
                    DragTarget::ResizeHandle {
                        job_id: job.id.clone(),
                        edge: ResizeEdge::Bottom,
                    },
                    CursorIcon::ResizeVertical,
                ));
                block_rects.push((block, DragTarget::Job(job.id.clone()), CursorIcon::Grab));
            }
        }

        // Splits paint over blocks and take priority when grabbed
        let mut split_targets = Vec::new();
        for column in &geometry.columns {
            for split in state.splits_for_driver(&column.driver_id) {
                let Ok(time) = split.time_minutes() else {
                    continue;
                };
                let y = geometry.y_for_minute(time, &window);
                let faded = active_id == Some(split.id.as_str());
                paint_split(ui, column.rect, y, &split.driver_name, &split.vehicle, faded);
                split_targets.push((
                    Rect::from_min_max(
                        egui::pos2(column.rect.min.x, y - SPLIT_GRAB),
                        egui::pos2(column.rect.max.x, y + SPLIT_GRAB),
                    ),
                    DragTarget::Split(split.id.clone()),
                    CursorIcon::ResizeRow,
                ));
            }
        }
        split_targets.extend(targets);
        split_targets.extend(block_rects);
        let targets = split_targets;

        paint_previews(ui, controller, &geometry, &window);

        let pointer = ui.ctx().pointer_hover_pos().filter(|pos| ui.clip_rect().contains(*pos));
        let hovered = pointer.and_then(|pos| targets.iter().find(|(rect, _, _)| rect.contains(pos)));

        if controller.is_idle() {
            if let Some((_, _, cursor)) = hovered {
                ui.ctx().set_cursor_icon(*cursor);
            }
        } else {
            let cursor = match controller.state() {
                DragState::Resizing(_) => CursorIcon::ResizeVertical,
                _ => CursorIcon::Grabbing,
            };
            ui.ctx().set_cursor_icon(cursor);
        }

        let pressed_button = ui.ctx().input(|i| {
            [PointerButton::Primary, PointerButton::Secondary]
                .into_iter()
                .find(|button| i.pointer.button_pressed(*button))
        });
        if let (Some(button), Some(pos), Some((_, target, _))) = (pressed_button, pointer, hovered) {
            result.pressed = Some((target.clone(), button, pos));
        }

        // Clicks on empty space select a cell
        for (i, column) in geometry.columns.iter().enumerate() {
            let response = ui.interact(column.rect, ui.id().with(("driver_col", i)), egui::Sense::click());
            if response.clicked() && hovered.is_none() {
                if let Some(pos) = response.interact_pointer_pos() {
                    let minute = window.clamp_start(geometry.slot_at_y(pos.y, &window));
                    result.clicked_cell = Some((column.driver_id.clone(), minute));
                }
            }
        }

        result.geometry = geometry;
    });

    result
}

fn block_rect(geometry: &BoardGeometry, window: &TimeWindow, column: Rect, start: u32, end: u32) -> Rect {
    let top = geometry.y_for_minute(start.max(window.start), window);
    let bottom = geometry.y_for_minute(end.min(window.end), window);
    Rect::from_min_max(
        egui::pos2(column.min.x + BLOCK_MARGIN, top + 1.0),
        egui::pos2(column.max.x - BLOCK_MARGIN, (bottom - 1.0).max(top + 8.0)),
    )
}

fn paint_time_axis(ui: &Ui, board_rect: Rect, geometry: &BoardGeometry, window: &TimeWindow) {
    let painter = ui.painter();
    let grid_left = board_rect.min.x + TIME_LABEL_WIDTH;
    let hour_line_color = Color32::from_rgb(0x50, 0x50, 0x4a);
    let quarter_color = Color32::from_rgb(0x24, 0x24, 0x22);

    for minute in window.slots() {
        let y = geometry.y_for_minute(minute, window);
        if minute % 60 == 0 {
            painter.text(
                egui::pos2(grid_left - 8.0, y),
                egui::Align2::RIGHT_TOP,
                minutes_to_time(minute),
                egui::FontId::proportional(11.0),
                Color32::from_rgb(0x70, 0x70, 0x68),
            );
            painter.line_segment(
                [egui::pos2(grid_left, y), egui::pos2(board_rect.max.x, y)],
                Stroke::new(1.0, hour_line_color),
            );
        } else {
            painter.line_segment(
                [egui::pos2(grid_left, y), egui::pos2(board_rect.max.x, y)],
                Stroke::new(1.0, quarter_color),
            );
        }
    }

    let bottom = geometry.y_for_minute(window.end, window);
    painter.line_segment(
        [egui::pos2(grid_left, bottom), egui::pos2(board_rect.max.x, bottom)],
        Stroke::new(1.0, hour_line_color),
    );

    for column in &geometry.columns {
        painter.line_segment(
            [egui::pos2(column.rect.min.x, board_rect.min.y), egui::pos2(column.rect.min.x, column.rect.max.y)],
            Stroke::new(1.0, Color32::from_rgb(0x40, 0x40, 0x3c)),
        );
    }
}

/// Driver headers with name, starting vehicle and reorder arrows
fn render_headers(
    ui: &mut Ui,
    board_rect: Rect,
    state: &BoardState,
    geometry: &BoardGeometry,
    window: &TimeWindow,
) -> Option<(String, usize)> {
    let mut reorder = None;
    let last = state.drivers.len().saturating_sub(1);

    for (i, (driver, column)) in state.drivers.iter().zip(&geometry.columns).enumerate() {
        let header = Rect::from_min_size(
            egui::pos2(column.rect.min.x, board_rect.min.y),
            egui::vec2(column.rect.width(), HEADER_HEIGHT),
        );
        let stripe_color = parse_hex_color(&driver.color).unwrap_or_else(|| {
            job_colors(ColorSlot {
                palette_index: i % PALETTE_SIZE,
                alternate: false,
            })
            .1
        });

        let painter = ui.painter().with_clip_rect(header.intersect(ui.clip_rect()));
        painter.rect_filled(
            Rect::from_min_size(header.min + egui::vec2(4.0, 4.0), egui::vec2(header.width() - 8.0, 3.0)),
            1.5,
            stripe_color,
        );
        painter.text(
            egui::pos2(header.min.x + 8.0, header.min.y + 12.0),
            egui::Align2::LEFT_TOP,
            &driver.name,
            egui::FontId::proportional(14.0),
            Color32::WHITE,
        );

        let vehicle = effective_vehicle(&driver.id, window.start, &state.splits, &state.drivers).unwrap_or("");
        let vehicle_line = if driver.course.is_empty() {
            format!("{} {}", egui_phosphor::regular::TRUCK, vehicle)
        } else {
            format!("{} {}  {}", egui_phosphor::regular::TRUCK, vehicle, driver.course)
        };
        painter.text(
            egui::pos2(header.min.x + 8.0, header.min.y + 32.0),
            egui::Align2::LEFT_TOP,
            vehicle_line,
            egui::FontId::proportional(12.0),
            Color32::from_rgb(176, 176, 168),
        );

        let arrows = [
            (i > 0, egui_phosphor::regular::CARET_LEFT, i.saturating_sub(1), 40.0),
            (i < last, egui_phosphor::regular::CARET_RIGHT, i + 1, 20.0),
        ];
        for (enabled, icon, target, offset) in arrows {
            if !enabled {
                continue;
            }
            let rect = Rect::from_center_size(
                egui::pos2(header.max.x - offset + 8.0, header.min.y + 19.0),
                egui::vec2(16.0, 16.0),
            );
            let response = ui.interact(rect, ui.id().with(("reorder", i, target)), egui::Sense::click());
            let color = if response.hovered() {
                Color32::WHITE
            } else {
                Color32::from_rgb(112, 112, 104)
            };
            if response.hovered() {
                ui.ctx().set_cursor_icon(CursorIcon::PointingHand);
            }
            painter.text(rect.center(), egui::Align2::CENTER_CENTER, icon, egui::FontId::proportional(13.0), color);
            if response.clicked() {
                reorder = Some((driver.id.clone(), target));
            }
        }
    }

    reorder
}

/// Paint a job block (no interaction, that is handled by the caller)
fn paint_job(ui: &Ui, rect: Rect, job: &Job, slot: ColorSlot, faded: bool) {
    let painter = ui.painter().with_clip_rect(rect.expand(1.0).intersect(ui.clip_rect()));
    let (bg, accent) = job_colors(slot);
    let alpha = if faded { 70 } else { 255 };
    let bg = Color32::from_rgba_unmultiplied(bg.r(), bg.g(), bg.b(), alpha);
    let accent = Color32::from_rgba_unmultiplied(accent.r(), accent.g(), accent.b(), alpha);
    let corner_radius = 4.0;

    painter.rect(rect, corner_radius, bg, Stroke::new(1.0, accent));

    // Left accent stripe
    let accent_width = 3.0;
    painter.rect(
        Rect::from_min_size(rect.min, egui::vec2(accent_width, rect.height())),
        egui::Rounding {
            nw: corner_radius,
            sw: corner_radius,
            ne: 0.0,
            se: 0.0,
        },
        accent,
        Stroke::NONE,
    );

    let text_left = rect.min.x + accent_width + 5.0;
    let text_color = Color32::from_rgba_unmultiplied(255, 255, 255, alpha);
    let secondary = Color32::from_rgba_unmultiplied(208, 208, 200, alpha);

    painter.text(
        egui::pos2(text_left, rect.min.y + 3.0),
        egui::Align2::LEFT_TOP,
        &job.title,
        egui::FontId::proportional(13.0),
        text_color,
    );

    if rect.height() > 34.0 {
        let mut details = format!(
            "{} · {}",
            job.start_time.as_deref().unwrap_or(""),
            format_duration(job.duration)
        );
        if let Some(bucket) = &job.bucket {
            details.push_str(&format!(" · {}", bucket));
        }
        painter.text(
            egui::pos2(text_left, rect.min.y + 19.0),
            egui::Align2::LEFT_TOP,
            details,
            egui::FontId::proportional(11.0),
            secondary,
        );
    }

    if job.is_vehicle_error {
        // Vehicle mismatch badge
        let badge = Rect::from_min_size(egui::pos2(rect.max.x - 20.0, rect.min.y + 2.0), egui::vec2(18.0, 16.0));
        painter.rect_filled(badge, 3.0, Color32::from_rgba_unmultiplied(0, 0, 0, 160));
        painter.text(
            badge.center(),
            egui::Align2::CENTER_CENTER,
            egui_phosphor::fill::WARNING,
            egui::FontId::new(12.0, phosphor_fill_family()),
            warning_color(),
        );
    }
}

fn paint_split(ui: &Ui, column: Rect, y: f32, driver_name: &str, vehicle: &str, faded: bool) {
    let painter = ui.painter().with_clip_rect(column.expand2(egui::vec2(0.0, 12.0)).intersect(ui.clip_rect()));
    let color = if faded {
        Color32::from_rgba_unmultiplied(229, 170, 0, 70)
    } else {
        warning_color()
    };

    painter.line_segment([egui::pos2(column.min.x, y), egui::pos2(column.max.x, y)], Stroke::new(2.0, color));

    let label = format!("{} {} · {}", egui_phosphor::regular::ARROWS_LEFT_RIGHT, driver_name, vehicle);
    let galley = painter.layout_no_wrap(label, egui::FontId::proportional(11.0), Color32::BLACK);
    let pill = Rect::from_min_size(
        egui::pos2(column.min.x + 4.0, y - galley.size().y - 2.0),
        galley.size() + egui::vec2(8.0, 2.0),
    );
    painter.rect_filled(pill, 3.0, color);
    painter.galley(pill.min + egui::vec2(4.0, 1.0), galley, Color32::BLACK);
}

/// Ghost blocks and split lines for the gesture in progress
fn paint_previews(ui: &Ui, controller: &DragDropController, geometry: &BoardGeometry, window: &TimeWindow) {
    let painter = ui.painter();

    if let Some(preview) = controller.preview() {
        if let Some(column) = geometry.columns.iter().find(|c| c.driver_id == preview.driver_id) {
            let rect = block_rect(geometry, window, column.rect, preview.start_min, preview.start_min + preview.duration);
            let base = if preview.is_overlap_error {
                error_color()
            } else {
                accent_color()
            };
            painter.rect(
                rect,
                4.0,
                Color32::from_rgba_unmultiplied(base.r(), base.g(), base.b(), 60),
                Stroke::new(2.0, base),
            );

            let label = format!("{} · {}", preview.start_time(), format_duration(preview.duration));
            painter.text(
                egui::pos2(rect.min.x + 6.0, rect.min.y + 3.0),
                egui::Align2::LEFT_TOP,
                label,
                egui::FontId::proportional(12.0),
                Color32::WHITE,
            );
            if preview.is_vehicle_error {
                painter.text(
                    egui::pos2(rect.max.x - 11.0, rect.min.y + 10.0),
                    egui::Align2::CENTER_CENTER,
                    egui_phosphor::fill::WARNING,
                    egui::FontId::new(12.0, phosphor_fill_family()),
                    warning_color(),
                );
            }
        }
    }

    if let Some(preview) = controller.split_preview() {
        if let Some(column) = geometry.columns.iter().find(|c| c.driver_id == preview.driver_id) {
            let y = geometry.y_for_minute(preview.time_min, window);
            let color = if preview.is_conflict {
                error_color()
            } else {
                accent_color()
            };
            painter.line_segment(
                [egui::pos2(column.rect.min.x, y), egui::pos2(column.rect.max.x, y)],
                Stroke::new(3.0, color),
            );
            painter.text(
                egui::pos2(column.rect.max.x - 4.0, y + 2.0),
                egui::Align2::RIGHT_TOP,
                minutes_to_time(preview.time_min),
                egui::FontId::proportional(11.0),
                color,
            );
        }
    }
}
