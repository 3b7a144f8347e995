use egui::{Color32, RichText};

use crate::board::{format_duration, time_to_minutes, Bucket, Job, JobDetails, Split, TimeWindow};
use super::pending::bucket_combo;
use super::theme::{button_colors, dialog_colors, error_color, warning_color};

pub enum DialogAction {
    Close,
    SaveJob(String, JobDetails),
    Unschedule(String),
    SaveSplit(Split),
    DeleteSplit(String),
}

fn dialog_frame() -> egui::Frame {
    let (content_bg, frame_color, _) = dialog_colors();
    egui::Frame::none()
        .fill(content_bg)
        .stroke(egui::Stroke::new(2.0, frame_color))
        .rounding(egui::Rounding::same(8.0))
        .inner_margin(egui::Margin::same(20.0))
}

fn styled_button(ui: &mut egui::Ui, text: String) -> egui::Response {
    let (button_bg, button_text) = button_colors();
    ui.add(egui::Button::new(RichText::new(text).color(button_text)).fill(button_bg))
}

/// Edit form for a job's title, note, bucket and required vehicle
pub struct JobDialog {
    job_id: String,
    title: String,
    note: String,
    bucket: Option<Bucket>,
    required_vehicle: String,
    /// "Sato · 09:00 · 30m", empty while pending
    placement: String,
    is_vehicle_error: bool,
    error: Option<String>,
}

impl JobDialog {
    pub fn open(job: &Job, driver_name: Option<&str>) -> Self {
        let placement = match (driver_name, job.start_time.as_deref()) {
            (Some(name), Some(start)) => format!("{} · {} · {}", name, start, format_duration(job.duration)),
            _ => String::new(),
        };
        Self {
            job_id: job.id.clone(),
            title: job.title.clone(),
            note: job.note.clone().unwrap_or_default(),
            bucket: job.bucket.clone(),
            required_vehicle: job.required_vehicle.clone().unwrap_or_default(),
            placement,
            is_vehicle_error: job.is_vehicle_error,
            error: None,
        }
    }

    fn details(&self) -> Result<JobDetails, String> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err("Title is required".to_string());
        }
        let vehicle = self.required_vehicle.trim();
        Ok(JobDetails {
            title: title.to_string(),
            note: Some(self.note.clone()),
            bucket: self.bucket.clone(),
            required_vehicle: (!vehicle.is_empty()).then(|| vehicle.to_string()),
        })
    }

    pub fn show(&mut self, ctx: &egui::Context) -> Option<DialogAction> {
        let mut action = None;
        let mut open = true;

        egui::Window::new("Job details")
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .default_width(380.0)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .frame(dialog_frame())
            .show(ctx, |ui| {
                if !self.placement.is_empty() {
                    ui.label(RichText::new(&self.placement).color(Color32::from_rgb(176, 176, 168)));
                }
                if self.is_vehicle_error {
                    ui.label(
                        RichText::new(format!("{} Vehicle does not match this column", egui_phosphor::regular::WARNING))
                            .color(warning_color()),
                    );
                }
                ui.add_space(4.0);

                ui.label("Title");
                ui.add(egui::TextEdit::singleline(&mut self.title).desired_width(f32::INFINITY));
                ui.label("Note");
                ui.add(egui::TextEdit::multiline(&mut self.note).desired_rows(3).desired_width(f32::INFINITY));
                ui.horizontal(|ui| {
                    ui.label("Bucket");
                    bucket_combo(ui, "job_dialog_bucket", &mut self.bucket);
                });
                ui.label("Required vehicle");
                ui.add(egui::TextEdit::singleline(&mut self.required_vehicle).desired_width(f32::INFINITY));

                if let Some(error) = &self.error {
                    ui.label(RichText::new(error).color(error_color()));
                }

                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if styled_button(ui, format!("{} Save", egui_phosphor::regular::FLOPPY_DISK)).clicked() {
                        match self.details() {
                            Ok(details) => action = Some(DialogAction::SaveJob(self.job_id.clone(), details)),
                            Err(message) => self.error = Some(message),
                        }
                    }
                    if !self.placement.is_empty()
                        && styled_button(ui, format!("{} Unschedule", egui_phosphor::regular::TRAY)).clicked()
                    {
                        action = Some(DialogAction::Unschedule(self.job_id.clone()));
                    }
                    if styled_button(ui, "Cancel".to_string()).clicked() {
                        action = Some(DialogAction::Close);
                    }
                });
            });

        if !open {
            return Some(DialogAction::Close);
        }
        action
    }
}

/// Add or edit a split on one driver column
pub struct SplitDialog {
    split_id: Option<String>,
    driver_id: String,
    column_name: String,
    time: String,
    driver_name: String,
    vehicle: String,
    window: TimeWindow,
    error: Option<String>,
}

impl SplitDialog {
    pub fn new_at(driver_id: &str, column_name: &str, time: String, window: TimeWindow) -> Self {
        Self {
            split_id: None,
            driver_id: driver_id.to_string(),
            column_name: column_name.to_string(),
            time,
            driver_name: String::new(),
            vehicle: String::new(),
            window,
            error: None,
        }
    }

    pub fn edit(split: &Split, column_name: &str, window: TimeWindow) -> Self {
        Self {
            split_id: Some(split.id.clone()),
            driver_id: split.driver_id.clone(),
            column_name: column_name.to_string(),
            time: split.time.clone(),
            driver_name: split.driver_name.clone(),
            vehicle: split.vehicle.clone(),
            window,
            error: None,
        }
    }

    fn build(&self) -> Result<Split, String> {
        let minutes = time_to_minutes(self.time.trim()).map_err(|e| e.to_string())?;
        if !self.window.contains_start(minutes) || minutes % 15 != 0 {
            return Err("Time must be a 15-minute slot inside the operating day".to_string());
        }
        if self.vehicle.trim().is_empty() {
            return Err("Vehicle is required".to_string());
        }

        let id = self
            .split_id
            .clone()
            .unwrap_or_else(|| format!("split-{}", chrono::Local::now().timestamp_millis()));
        Ok(Split {
            id,
            driver_id: self.driver_id.clone(),
            time: self.time.trim().to_string(),
            driver_name: self.driver_name.trim().to_string(),
            vehicle: self.vehicle.trim().to_string(),
        })
    }

    pub fn show(&mut self, ctx: &egui::Context) -> Option<DialogAction> {
        let mut action = None;
        let mut open = true;
        let title = if self.split_id.is_some() { "Edit split" } else { "Add split" };

        egui::Window::new(title)
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .default_width(320.0)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .frame(dialog_frame())
            .show(ctx, |ui| {
                ui.label(RichText::new(&self.column_name).color(Color32::from_rgb(176, 176, 168)));
                ui.add_space(4.0);

                egui::Grid::new("split_form").num_columns(2).spacing([12.0, 8.0]).show(ui, |ui| {
                    ui.label("Time");
                    ui.add(egui::TextEdit::singleline(&mut self.time).hint_text("HH:MM").desired_width(80.0));
                    ui.end_row();
                    ui.label("Driver");
                    ui.text_edit_singleline(&mut self.driver_name);
                    ui.end_row();
                    ui.label("Vehicle");
                    ui.text_edit_singleline(&mut self.vehicle);
                    ui.end_row();
                });

                if let Some(error) = &self.error {
                    ui.label(RichText::new(error).color(error_color()));
                }

                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if styled_button(ui, format!("{} Save", egui_phosphor::regular::FLOPPY_DISK)).clicked() {
                        match self.build() {
                            Ok(split) => action = Some(DialogAction::SaveSplit(split)),
                            Err(message) => self.error = Some(message),
                        }
                    }
                    if let Some(split_id) = &self.split_id {
                        if styled_button(ui, format!("{} Delete", egui_phosphor::regular::TRASH)).clicked() {
                            action = Some(DialogAction::DeleteSplit(split_id.clone()));
                        }
                    }
                    if styled_button(ui, "Cancel".to_string()).clicked() {
                        action = Some(DialogAction::Close);
                    }
                });
            });

        if !open {
            return Some(DialogAction::Close);
        }
        action
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_details_need_a_title() {
        let job = Job::pending("J1", "Bins", 30).scheduled("D1", "09:00");
        let mut dialog = JobDialog::open(&job, Some("Sato"));
        assert_eq!(dialog.placement, "Sato · 09:00 · 30m");

        dialog.title = "   ".to_string();
        assert!(dialog.details().is_err());

        dialog.title = "Bins (north)".to_string();
        dialog.required_vehicle = " ".to_string();
        let details = dialog.details().unwrap();
        assert_eq!(details.title, "Bins (north)");
        assert_eq!(details.required_vehicle, None);
    }

    #[test]
    fn split_form_validates_time_and_vehicle() {
        let mut dialog = SplitDialog::new_at("D1", "Sato", "12:00".to_string(), TimeWindow::default());
        assert!(dialog.build().is_err());

        dialog.vehicle = "TruckB".to_string();
        let split = dialog.build().unwrap();
        assert_eq!(split.driver_id, "D1");
        assert_eq!(split.time, "12:00");

        dialog.time = "12:10".to_string();
        assert!(dialog.build().is_err());
        dialog.time = "19:00".to_string();
        assert!(dialog.build().is_err());
        dialog.time = "noon".to_string();
        assert!(dialog.build().is_err());
    }

    #[test]
    fn editing_keeps_the_split_id() {
        let split = Split {
            id: "S1".to_string(),
            driver_id: "D1".to_string(),
            time: "12:00".to_string(),
            driver_name: "Relief".to_string(),
            vehicle: "TruckB".to_string(),
        };
        let mut dialog = SplitDialog::edit(&split, "Sato", TimeWindow::default());
        dialog.time = "13:00".to_string();
        let updated = dialog.build().unwrap();
        assert_eq!(updated.id, "S1");
        assert_eq!(updated.time, "13:00");
    }
}
