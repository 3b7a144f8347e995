use chrono::{Duration, Local, NaiveDate};
use eframe::egui;
use egui::{Color32, RichText};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};
use tracing::{debug, error, info, warn};

use crate::board::{
    minutes_to_time, shortcut_action, BoardGeometry, BoardModel, BoardState, Commit, DragDropController, DragOutcome,
    DragTarget, HistoryAction, PointerEvent, TimeWindow,
};
use crate::config::Config;
use crate::store::{spawn_worker, BoardStore, JsonFileStore, StoreEvent, StoreRequest};
use super::board_view::{render_board, BoardLayout};
use super::dialogs::{DialogAction, JobDialog, SplitDialog};
use super::pending::PendingPanel;

pub struct DispatchApp {
    config: Config,
    window: TimeWindow,

    // Current board
    /// Date of the board in `model`; only changes once a load lands
    selected_date: NaiveDate,
    model: BoardModel,
    controller: DragDropController,
    /// Board layout from the previous frame, used to hit-test pointer moves
    geometry: BoardGeometry,

    // Selection
    selected_pending: Option<String>,
    selected_cell: Option<(String, u32)>,

    pending_panel: PendingPanel,
    job_dialog: Option<JobDialog>,
    split_dialog: Option<SplitDialog>,

    // Status
    status_message: Option<(String, bool)>, // (message, is_error)
    /// Date being loaded; the board is read-only until it lands
    loading: Option<NaiveDate>,
    /// Set on every board change, cleared once the save is queued
    dirty_since: Option<Instant>,
    queued_saves: usize,

    // Async communication, declared before the runtime so the worker sees
    // its channel close before the runtime shuts down
    store_tx: Sender<StoreRequest>,
    result_rx: Receiver<StoreEvent>,
    /// Hosts the store worker
    _runtime: tokio::runtime::Runtime,
}

impl DispatchApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: Config, runtime: tokio::runtime::Runtime) -> anyhow::Result<Self> {
        super::setup_fonts(&cc.egui_ctx);
        super::setup_theme(&cc.egui_ctx);

        let window = config.time_window()?;
        let store: Arc<dyn BoardStore> = Arc::new(JsonFileStore::new(config.data_dir()?));
        let (result_tx, result_rx) = channel();
        let store_tx = spawn_worker(runtime.handle(), store, result_tx);
        let today = Local::now().date_naive();

        let mut app = Self {
            model: BoardModel::with_history_limit(BoardState::with_roster(config.roster.clone()), config.history_limit),
            controller: DragDropController::new(window),
            geometry: BoardGeometry::default(),
            window,
            selected_date: today,
            selected_pending: None,
            selected_cell: None,
            pending_panel: PendingPanel::default(),
            job_dialog: None,
            split_dialog: None,
            status_message: None,
            loading: None,
            dirty_since: None,
            queued_saves: 0,
            config,
            store_tx,
            result_rx,
            _runtime: runtime,
        };

        app.load_board(today);
        Ok(app)
    }

    fn check_async_results(&mut self) {
        while let Ok(event) = self.result_rx.try_recv() {
            match event {
                StoreEvent::Loaded(date, state) => {
                    // A reply for a date we already navigated away from
                    if self.loading != Some(date) {
                        debug!(%date, "dropping stale board load");
                        continue;
                    }
                    info!(%date, drivers = state.drivers.len(), jobs = state.jobs.len(), "board ready");
                    self.loading = None;
                    self.selected_date = date;
                    self.controller.cancel();
                    self.model.replace_state(state);
                    self.selected_pending = None;
                    self.selected_cell = None;
                    self.job_dialog = None;
                    self.split_dialog = None;
                    self.status_message = None;
                }
                StoreEvent::LoadFailed(date, msg) => {
                    if self.loading == Some(date) {
                        self.loading = None;
                    }
                    self.status_message = Some((msg, true));
                }
                StoreEvent::Saved(date) => {
                    self.queued_saves = self.queued_saves.saturating_sub(1);
                    debug!(%date, "save confirmed");
                }
                StoreEvent::SaveFailed(date, msg) => {
                    self.queued_saves = self.queued_saves.saturating_sub(1);
                    // The model still holds that board, so retry on the next autosave
                    if date == self.selected_date {
                        self.mark_dirty();
                    }
                    self.status_message = Some((msg, true));
                }
            }
        }
    }

    fn send(&mut self, request: StoreRequest) -> bool {
        if self.store_tx.send(request).is_err() {
            error!("store worker is gone");
            self.status_message = Some(("Storage is unavailable".to_string(), true));
            return false;
        }
        true
    }

    /// Queue a load for `date`. Unsaved edits are queued first, so the load
    /// always reads them back.
    fn load_board(&mut self, date: NaiveDate) {
        self.flush_save();
        self.controller.cancel();
        self.job_dialog = None;
        self.split_dialog = None;

        let roster = self.config.roster.clone();
        if self.send(StoreRequest::Load(date, roster)) {
            self.loading = Some(date);
        }
    }

    fn mark_dirty(&mut self) {
        if self.dirty_since.is_none() {
            self.dirty_since = Some(Instant::now());
        }
    }

    /// Queue a write of the board if there are unsaved changes
    fn flush_save(&mut self) {
        if self.dirty_since.take().is_none() {
            return;
        }
        let request = StoreRequest::Save(self.selected_date, self.model.snapshot());
        if self.send(request) {
            self.queued_saves += 1;
        } else {
            self.mark_dirty();
        }
    }

    /// Board edits are refused while another board is on its way in
    fn editable(&self) -> bool {
        self.loading.is_none()
    }

    fn apply_history(&mut self, action: HistoryAction) {
        if self.controller.cancel() {
            debug!("drag cancelled by history shortcut");
        }
        if self.model.apply_history(action) {
            self.mark_dirty();
        }
    }

    fn dialog_open(&self) -> bool {
        self.job_dialog.is_some() || self.split_dialog.is_some()
    }

    /// Report a failed board operation; nothing was changed
    fn report(&mut self, result: crate::board::BoardResult<()>) {
        match result {
            Ok(()) => self.mark_dirty(),
            Err(e) => {
                warn!("board operation rejected: {}", e);
                self.status_message = Some((e.to_string(), true));
            }
        }
    }

    fn handle_keyboard(&mut self, ctx: &egui::Context) {
        let input_focused = self.dialog_open() || !self.editable() || ctx.memory(|m| m.focused().is_some());
        let keys: Vec<(egui::Key, egui::Modifiers)> = ctx.input(|i| {
            i.events
                .iter()
                .filter_map(|event| match event {
                    egui::Event::Key { key, pressed: true, modifiers, .. } => Some((*key, *modifiers)),
                    _ => None,
                })
                .collect()
        });

        for (key, modifiers) in keys {
            if let Some(action) = shortcut_action(modifiers, key, input_focused) {
                self.apply_history(action);
                continue;
            }
            if key == egui::Key::S && (modifiers.command || modifiers.ctrl) && !input_focused {
                self.flush_save();
            }
        }
    }

    /// Feed window-level pointer movement and release into the drag controller.
    ///
    /// Runs before painting so the preview drawn this frame is current, and uses
    /// last frame's geometry. Releases are taken from the whole window so a drop
    /// outside the board still ends the gesture.
    fn route_pointer(&mut self, ctx: &egui::Context) {
        if self.controller.is_idle() {
            return;
        }

        let (pos, moved, released) = ctx.input(|i| {
            (
                i.pointer.latest_pos().or_else(|| i.pointer.interact_pos()),
                i.pointer.delta() != egui::Vec2::ZERO,
                i.pointer.any_released(),
            )
        });
        if let Some(outcome) = self.controller.route(pos, moved, released, &mut self.model, &self.geometry) {
            self.on_drag_outcome(outcome);
        }
        ctx.request_repaint();
    }

    fn on_drag_outcome(&mut self, outcome: DragOutcome) {
        match outcome {
            DragOutcome::Committed(commit) => {
                if let Commit::Assigned(job_id) = &commit {
                    if self.selected_pending.as_ref() == Some(job_id) {
                        self.selected_pending = None;
                    }
                }
                self.mark_dirty();
            }
            DragOutcome::Unchanged(DragTarget::Job(job_id)) => self.open_job_dialog(&job_id),
            DragOutcome::Unchanged(DragTarget::PendingJob(job_id)) => {
                self.selected_pending = if self.selected_pending.as_deref() == Some(job_id.as_str()) {
                    None
                } else {
                    Some(job_id)
                };
            }
            DragOutcome::Unchanged(DragTarget::Split(split_id)) => {
                let state = self.model.state();
                if let Some(split) = state.split(&split_id) {
                    let column = state.driver(&split.driver_id).map(|d| d.name.as_str()).unwrap_or("");
                    self.split_dialog = Some(SplitDialog::edit(split, column, self.window));
                }
            }
            DragOutcome::Discarded => {
                self.status_message = Some(("Drop rejected: that time is taken".to_string(), true));
            }
            _ => {}
        }
    }

    fn open_job_dialog(&mut self, job_id: &str) {
        let state = self.model.state();
        let job = state.job(job_id).or_else(|| state.pending_job(job_id));
        if let Some(job) = job {
            let driver_name = job
                .driver_id
                .as_deref()
                .and_then(|id| state.driver(id))
                .map(|d| d.name.as_str());
            self.job_dialog = Some(JobDialog::open(job, driver_name));
        }
    }

    fn handle_dialog_action(&mut self, action: DialogAction) {
        match action {
            DialogAction::Close => {}
            DialogAction::SaveJob(job_id, details) => {
                let result = self.model.update_job_details(&job_id, details);
                self.report(result);
            }
            DialogAction::Unschedule(job_id) => {
                let result = self.model.delete_job(&job_id);
                self.report(result);
            }
            DialogAction::SaveSplit(split) => {
                let result = self.model.upsert_split(split);
                self.report(result);
            }
            DialogAction::DeleteSplit(split_id) => {
                let result = self.model.delete_split(&split_id);
                self.report(result);
            }
        }
        self.job_dialog = None;
        self.split_dialog = None;
    }

    fn assign_selected(&mut self) {
        let (Some(job_id), Some((driver_id, minute))) = (self.selected_pending.clone(), self.selected_cell.clone())
        else {
            return;
        };
        let result = self.model.assign_pending_job(&job_id, &driver_id, &minutes_to_time(minute));
        if result.is_ok() {
            self.selected_pending = None;
        }
        self.report(result);
    }

    fn render_top_bar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let (button_bg, button_text) = super::theme::button_colors();

            // Date navigation pill
            egui::Frame::none()
                .fill(button_bg)
                .rounding(egui::Rounding::same(12.0))
                .inner_margin(egui::Margin::symmetric(8.0, 4.0))
                .show(ui, |ui| {
                    ui.horizontal(|ui| {
                        let left_arrow = ui.add(egui::Label::new(
                            RichText::new(egui_phosphor::regular::CARET_LEFT).size(14.0).color(button_text)
                        ).sense(egui::Sense::click()));
                        if left_arrow.hovered() {
                            ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
                        }
                        if left_arrow.clicked() {
                            self.load_board(self.shown_date() - Duration::days(1));
                        }

                        ui.label(
                            RichText::new(self.shown_date().format("%a %b %-d, %Y").to_string())
                                .size(14.0)
                                .color(Color32::WHITE),
                        );

                        let right_arrow = ui.add(egui::Label::new(
                            RichText::new(egui_phosphor::regular::CARET_RIGHT).size(14.0).color(button_text)
                        ).sense(egui::Sense::click()));
                        if right_arrow.hovered() {
                            ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
                        }
                        if right_arrow.clicked() {
                            self.load_board(self.shown_date() + Duration::days(1));
                        }
                    });
                });

            let today = Local::now().date_naive();
            if self.shown_date() != today && ui.button("Today").clicked() {
                self.load_board(today);
            }

            ui.add_space(12.0);

            let editable = self.editable();
            let undo = ui.add_enabled(
                editable && self.model.can_undo(),
                egui::Button::new(RichText::new(egui_phosphor::regular::ARROW_COUNTER_CLOCKWISE).size(16.0)),
            );
            if undo.on_hover_text("Undo (Ctrl+Z)").clicked() {
                self.apply_history(HistoryAction::Undo);
            }
            let redo = ui.add_enabled(
                editable && self.model.can_redo(),
                egui::Button::new(RichText::new(egui_phosphor::regular::ARROW_CLOCKWISE).size(16.0)),
            );
            if redo.on_hover_text("Redo (Ctrl+Y)").clicked() {
                self.apply_history(HistoryAction::Redo);
            }

            let save = ui.add(egui::Button::new(RichText::new(egui_phosphor::regular::FLOPPY_DISK).size(16.0)));
            if save.on_hover_text("Save now").clicked() {
                self.flush_save();
            }
            let reload = ui.add_enabled(
                editable,
                egui::Button::new(RichText::new(egui_phosphor::regular::ARROWS_CLOCKWISE).size(16.0)),
            );
            if reload.on_hover_text("Reload from disk").clicked() {
                self.load_board(self.selected_date);
            }

            let split_here = ui.add_enabled(
                editable && self.selected_cell.is_some(),
                egui::Button::new(format!("{} Add split", egui_phosphor::regular::ARROWS_LEFT_RIGHT)),
            );
            if split_here.clicked() {
                if let Some((driver_id, minute)) = &self.selected_cell {
                    let column = self.model.state().driver(driver_id).map(|d| d.name.clone()).unwrap_or_default();
                    self.split_dialog = Some(SplitDialog::new_at(driver_id, &column, minutes_to_time(*minute), self.window));
                }
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if self.loading.is_some() {
                    ui.spinner();
                } else if self.dirty_since.is_some() {
                    ui.label(RichText::new("Unsaved").color(Color32::from_rgb(112, 112, 104)));
                }
                if let Some((driver_id, minute)) = &self.selected_cell {
                    let name = self.model.state().driver(driver_id).map(|d| d.name.as_str()).unwrap_or("");
                    ui.label(
                        RichText::new(format!("{} {}", name, minutes_to_time(*minute)))
                            .color(super::theme::accent_color()),
                    );
                }
            });
        });
    }

    /// Date in the header: the one being loaded, else the one on screen
    fn shown_date(&self) -> NaiveDate {
        self.loading.unwrap_or(self.selected_date)
    }

    fn render_status(&mut self, ui: &mut egui::Ui) {
        let mut dismiss_message = false;
        if let Some((msg, is_error)) = &self.status_message {
            let color = if *is_error {
                super::theme::error_color()
            } else {
                super::theme::ok_color()
            };
            let dim_color = Color32::from_rgb(120, 120, 130);
            ui.horizontal(|ui| {
                ui.add(egui::Label::new(RichText::new(msg).color(color)));
                ui.add_space(8.0);

                let close_btn = ui.add(egui::Label::new(
                    RichText::new(egui_phosphor::regular::X).size(14.0).color(dim_color)
                ).sense(egui::Sense::click()));
                if close_btn.hovered() {
                    ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
                }
                if close_btn.clicked() {
                    dismiss_message = true;
                }
            });
        }
        if dismiss_message {
            self.status_message = None;
        }
    }
}

impl eframe::App for DispatchApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Handle pinch-to-zoom (trackpad pinch or Ctrl+scroll)
        let zoom_delta = ctx.input(|i| i.zoom_delta());
        if zoom_delta != 1.0 {
            self.config.font_scale = (self.config.font_scale * zoom_delta).clamp(0.75, 2.5);
            if (zoom_delta - 1.0).abs() > 0.01 {
                if let Err(e) = self.config.save() {
                    warn!("config save failed: {:#}", e);
                }
            }
        }
        ctx.set_pixels_per_point(self.config.font_scale);

        self.check_async_results();
        if self.loading.is_some() || self.queued_saves > 0 {
            // Keep polling the worker while it has replies owed
            ctx.request_repaint_after(StdDuration::from_millis(100));
        }
        self.handle_keyboard(ctx);
        self.route_pointer(ctx);

        let mut pending_result = None;
        egui::TopBottomPanel::top("top_bar")
            .frame(egui::Frame::none().inner_margin(egui::Margin::symmetric(12.0, 8.0)))
            .show(ctx, |ui| {
                self.render_top_bar(ui);
                self.render_status(ui);
            });

        egui::SidePanel::left("pending_pool")
            .resizable(true)
            .default_width(260.0)
            .frame(egui::Frame::none().inner_margin(egui::Margin::symmetric(12.0, 8.0)))
            .show(ctx, |ui| {
                let can_assign = self.editable() && self.selected_cell.is_some();
                pending_result = Some(self.pending_panel.render(
                    ui,
                    self.model.state(),
                    self.selected_pending.as_deref(),
                    can_assign,
                ));
            });

        let layout = BoardLayout {
            window: self.window,
            pixels_per_minute: self.config.pixels_per_minute(),
            column_width: self.config.column_width,
        };
        let board_result = egui::CentralPanel::default()
            .frame(egui::Frame::none().inner_margin(egui::Margin::symmetric(12.0, 0.0)))
            .show(ctx, |ui| {
                render_board(ui, self.model.state(), &self.controller, self.selected_cell.as_ref(), &layout)
            })
            .inner;
        self.geometry = board_result.geometry;

        if let Some(cell) = board_result.clicked_cell {
            self.selected_cell = Some(cell);
        }
        let editable = self.editable();
        if let Some((driver_id, index)) = board_result.reorder.filter(|_| editable) {
            let result = self.model.reorder_driver(&driver_id, index);
            self.report(result);
        }

        let mut pressed = board_result.pressed.filter(|_| editable);
        if let Some(result) = pending_result.filter(|_| editable) {
            if result.assign_selected {
                self.assign_selected();
            }
            if let Some(job_id) = result.remove {
                match self.model.remove_pending_job(&job_id) {
                    Ok(job) => {
                        info!(job = %job.id, "pending job removed");
                        self.mark_dirty();
                    }
                    Err(e) => self.status_message = Some((e.to_string(), true)),
                }
            }
            if let Some(job) = result.add {
                self.model.add_pending_job(job);
                self.mark_dirty();
            }
            pressed = pressed.or(result.pressed);
        }

        // Presses only start gestures while no dialog is up
        if let Some((target, button, pos)) = pressed {
            if !self.dialog_open() {
                let event = PointerEvent::Down { target, button, pos };
                self.controller.handle(event, &mut self.model, &self.geometry);

                // A click can press and release within one frame
                if !self.controller.is_idle() && ctx.input(|i| i.pointer.any_released()) {
                    let outcome = self.controller.handle(PointerEvent::Up { pos }, &mut self.model, &self.geometry);
                    self.on_drag_outcome(outcome);
                }
            }
        }

        if let Some(dialog) = self.job_dialog.as_mut() {
            if let Some(action) = dialog.show(ctx) {
                self.handle_dialog_action(action);
            }
        }
        if let Some(dialog) = self.split_dialog.as_mut() {
            if let Some(action) = dialog.show(ctx) {
                self.handle_dialog_action(action);
            }
        }

        // Debounced autosave
        if let Some(since) = self.dirty_since {
            let debounce = StdDuration::from_millis(self.config.save_debounce_ms);
            let elapsed = since.elapsed();
            if elapsed >= debounce {
                self.flush_save();
            } else {
                ctx.request_repaint_after(debounce - elapsed);
            }
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.flush_save();
        if self.queued_saves == 0 {
            return;
        }

        // Wait for the worker to drain queued saves before the runtime goes away
        let deadline = Instant::now() + StdDuration::from_secs(3);
        while self.queued_saves > 0 {
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                break;
            };
            match self.result_rx.recv_timeout(remaining) {
                Ok(StoreEvent::Saved(_)) => self.queued_saves -= 1,
                Ok(StoreEvent::SaveFailed(date, msg)) => {
                    error!(%date, "final save failed: {}", msg);
                    self.queued_saves -= 1;
                }
                Ok(_) => {}
                Err(_) => break,
            }
        }
        if self.queued_saves > 0 {
            warn!(pending = self.queued_saves, "exiting before every save was confirmed");
        }
    }
}
