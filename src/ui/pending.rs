use egui::{Color32, CursorIcon, PointerButton, Pos2, RichText, Ui};

use crate::board::{format_duration, BoardState, Bucket, DragTarget, Job, SLOT_MINUTES};
use super::theme::{accent_color, button_colors, card_colors, warning_color};

const CARD_HEIGHT: f32 = 46.0;

/// Which pending jobs the panel lists
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BucketFilter {
    #[default]
    All,
    Only(Bucket),
}

impl BucketFilter {
    fn matches(&self, job: &Job) -> bool {
        match self {
            BucketFilter::All => true,
            BucketFilter::Only(bucket) => job.bucket.as_ref() == Some(bucket),
        }
    }

    fn label(&self) -> String {
        match self {
            BucketFilter::All => "All".to_string(),
            BucketFilter::Only(bucket) => bucket.to_string(),
        }
    }

    /// Fixed buckets first, then each custom label found in the pool, once
    fn options(pending: &[Job]) -> Vec<BucketFilter> {
        let mut options = vec![
            BucketFilter::All,
            BucketFilter::Only(Bucket::Am),
            BucketFilter::Only(Bucket::Pm),
            BucketFilter::Only(Bucket::Free),
        ];
        for job in pending {
            if let Some(custom @ Bucket::Custom(_)) = &job.bucket {
                let option = BucketFilter::Only(custom.clone());
                if !options.contains(&option) {
                    options.push(option);
                }
            }
        }
        options
    }
}

/// Panel-local UI state (filter and the new-job form)
pub struct PendingPanel {
    pub filter: BucketFilter,
    new_title: String,
    new_duration: u32,
    new_bucket: Option<Bucket>,
    new_vehicle: String,
    next_id: u64,
}

impl Default for PendingPanel {
    fn default() -> Self {
        Self {
            filter: BucketFilter::All,
            new_title: String::new(),
            new_duration: 30,
            new_bucket: None,
            new_vehicle: String::new(),
            next_id: 1,
        }
    }
}

#[derive(Default)]
pub struct PendingResult {
    pub pressed: Option<(DragTarget, PointerButton, Pos2)>,
    pub assign_selected: bool,
    pub remove: Option<String>,
    pub add: Option<Job>,
}

impl PendingPanel {
    fn take_new_job(&mut self) -> Option<Job> {
        let title = self.new_title.trim();
        if title.is_empty() {
            return None;
        }

        // Millisecond stamp plus a counter keeps ids unique within a session
        let id = format!("job-{}-{}", chrono::Local::now().timestamp_millis(), self.next_id);
        self.next_id += 1;

        let mut job = Job::pending(id, title, self.new_duration);
        job.bucket = self.new_bucket.clone();
        let vehicle = self.new_vehicle.trim();
        if !vehicle.is_empty() {
            job.required_vehicle = Some(vehicle.to_string());
        }

        self.new_title.clear();
        self.new_vehicle.clear();
        Some(job)
    }

    pub fn render(
        &mut self,
        ui: &mut Ui,
        state: &BoardState,
        selected_job: Option<&str>,
        can_assign: bool,
    ) -> PendingResult {
        let mut result = PendingResult::default();

        ui.horizontal(|ui| {
            ui.label(RichText::new("Pending").strong());
            ui.label(RichText::new(state.pending_jobs.len().to_string()).color(Color32::from_rgb(112, 112, 104)));
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                egui::ComboBox::from_id_salt("bucket_filter")
                    .selected_text(self.filter.label())
                    .show_ui(ui, |ui| {
                        for filter in BucketFilter::options(&state.pending_jobs) {
                            let label = filter.label();
                            ui.selectable_value(&mut self.filter, filter, label);
                        }
                    });
            });
        });

        ui.add_space(4.0);

        let assign_text = format!("{} Assign to selected cell", egui_phosphor::regular::ARROW_SQUARE_IN);
        let assign_enabled = can_assign && selected_job.is_some();
        if ui.add_enabled(assign_enabled, egui::Button::new(assign_text)).clicked() {
            result.assign_selected = true;
        }

        ui.separator();

        let available = ui.available_height() - 170.0;
        egui::ScrollArea::vertical()
            .max_height(available.max(120.0))
            .auto_shrink([false, false])
            .show(ui, |ui| {
                let jobs: Vec<&Job> = state.pending_jobs.iter().filter(|job| self.filter.matches(job)).collect();
                if jobs.is_empty() {
                    ui.label(RichText::new("Nothing pending").color(Color32::from_rgb(112, 112, 104)));
                }
                for job in jobs {
                    let selected = selected_job == Some(job.id.as_str());
                    if let Some(press) = render_card(ui, job, selected, &mut result.remove) {
                        result.pressed = Some(press);
                    }
                }
            });

        ui.separator();
        self.render_new_job_form(ui, &mut result);

        result
    }

    fn render_new_job_form(&mut self, ui: &mut Ui, result: &mut PendingResult) {
        ui.label(RichText::new("New job").strong());
        ui.add(egui::TextEdit::singleline(&mut self.new_title).hint_text("Title"));
        ui.horizontal(|ui| {
            ui.add(
                egui::DragValue::new(&mut self.new_duration)
                    .range(SLOT_MINUTES..=600)
                    .speed(SLOT_MINUTES as f64)
                    .suffix(" min"),
            );
            bucket_combo(ui, "new_bucket", &mut self.new_bucket);
        });
        ui.add(egui::TextEdit::singleline(&mut self.new_vehicle).hint_text("Required vehicle (optional)"));

        let (button_bg, button_text) = button_colors();
        let add = ui.add(
            egui::Button::new(RichText::new(format!("{} Add", egui_phosphor::regular::PLUS)).color(button_text))
                .fill(button_bg),
        );
        if add.clicked() {
            result.add = self.take_new_job();
        }
    }
}

/// One pending job card. Returns a pointer press on the card body.
fn render_card(
    ui: &mut Ui,
    job: &Job,
    selected: bool,
    remove: &mut Option<String>,
) -> Option<(DragTarget, PointerButton, Pos2)> {
    let (bg, text_color, secondary) = card_colors();
    let (rect, response) = ui.allocate_exact_size(
        egui::vec2(ui.available_width(), CARD_HEIGHT),
        egui::Sense::hover(),
    );

    let painter = ui.painter().with_clip_rect(rect.intersect(ui.clip_rect()));
    let stroke_color = if selected {
        accent_color()
    } else {
        Color32::from_rgb(56, 56, 52)
    };
    painter.rect(rect, 6.0, bg, egui::Stroke::new(if selected { 2.0 } else { 1.0 }, stroke_color));

    painter.text(
        egui::pos2(rect.min.x + 10.0, rect.min.y + 6.0),
        egui::Align2::LEFT_TOP,
        &job.title,
        egui::FontId::proportional(14.0),
        text_color,
    );

    let mut details = format_duration(job.duration);
    if let Some(bucket) = &job.bucket {
        details.push_str(&format!(" · {}", bucket));
    }
    painter.text(
        egui::pos2(rect.min.x + 10.0, rect.min.y + 26.0),
        egui::Align2::LEFT_TOP,
        details,
        egui::FontId::proportional(12.0),
        secondary,
    );

    if let Some(vehicle) = &job.required_vehicle {
        painter.text(
            egui::pos2(rect.max.x - 30.0, rect.min.y + 26.0),
            egui::Align2::RIGHT_TOP,
            format!("{} {}", egui_phosphor::regular::TRUCK, vehicle),
            egui::FontId::proportional(12.0),
            warning_color(),
        );
    }

    // Remove button in the top-right corner
    let trash_rect = egui::Rect::from_center_size(
        egui::pos2(rect.max.x - 14.0, rect.min.y + 14.0),
        egui::vec2(18.0, 18.0),
    );
    let trash = ui.interact(trash_rect, ui.id().with(("remove_pending", &job.id)), egui::Sense::click());
    let trash_color = if trash.hovered() {
        Color32::WHITE
    } else {
        Color32::from_rgb(112, 112, 104)
    };
    painter.text(
        trash_rect.center(),
        egui::Align2::CENTER_CENTER,
        egui_phosphor::regular::TRASH,
        egui::FontId::proportional(14.0),
        trash_color,
    );
    if trash.clicked() {
        *remove = Some(job.id.clone());
        return None;
    }

    let pointer = ui.ctx().pointer_hover_pos()?;
    if !response.hovered() || trash_rect.contains(pointer) {
        return None;
    }
    ui.ctx().set_cursor_icon(CursorIcon::Grab);

    let button = ui.ctx().input(|i| {
        [PointerButton::Primary, PointerButton::Secondary]
            .into_iter()
            .find(|button| i.pointer.button_pressed(*button))
    })?;
    Some((DragTarget::PendingJob(job.id.clone()), button, pointer))
}

/// Bucket picker shared by the new-job form and the job dialog
pub fn bucket_combo(ui: &mut Ui, id_salt: &str, bucket: &mut Option<Bucket>) {
    let label = bucket.as_ref().map(|b| b.to_string()).unwrap_or_else(|| "No bucket".to_string());
    egui::ComboBox::from_id_salt(id_salt).selected_text(label).show_ui(ui, |ui| {
        ui.selectable_value(bucket, None, "No bucket");
        for option in [Bucket::Am, Bucket::Pm, Bucket::Free] {
            let text = option.to_string();
            ui.selectable_value(bucket, Some(option), text);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_matches_on_bucket() {
        let am = Job::pending("a", "a", 15).with_bucket(Bucket::Am);
        let none = Job::pending("b", "b", 15);

        assert!(BucketFilter::All.matches(&am));
        assert!(BucketFilter::All.matches(&none));
        assert!(BucketFilter::Only(Bucket::Am).matches(&am));
        assert!(!BucketFilter::Only(Bucket::Pm).matches(&am));
        assert!(!BucketFilter::Only(Bucket::Am).matches(&none));
    }

    #[test]
    fn filter_offers_custom_labels_from_the_pool() {
        let pending = vec![
            Job::pending("a", "a", 15).with_bucket(Bucket::Custom("Bulky".to_string())),
            Job::pending("b", "b", 15).with_bucket(Bucket::Am),
            Job::pending("c", "c", 15).with_bucket(Bucket::Custom("Bulky".to_string())),
            Job::pending("d", "d", 15).with_bucket(Bucket::Custom("Glass".to_string())),
            Job::pending("e", "e", 15),
        ];
        let options = BucketFilter::options(&pending);
        assert_eq!(
            options[4..],
            [
                BucketFilter::Only(Bucket::Custom("Bulky".to_string())),
                BucketFilter::Only(Bucket::Custom("Glass".to_string())),
            ]
        );
        assert_eq!(options.len(), 6);
        assert!(options[4].matches(&pending[0]));
        assert!(!options[4].matches(&pending[3]));
    }

    #[test]
    fn new_job_needs_a_title() {
        let mut panel = PendingPanel::default();
        assert!(panel.take_new_job().is_none());

        panel.new_title = "  Cardboard ".to_string();
        panel.new_bucket = Some(Bucket::Pm);
        panel.new_vehicle = "TruckA".to_string();
        let first = panel.take_new_job().unwrap();
        assert_eq!(first.title, "Cardboard");
        assert_eq!(first.duration, 30);
        assert_eq!(first.bucket, Some(Bucket::Pm));
        assert_eq!(first.required_vehicle.as_deref(), Some("TruckA"));
        assert!(panel.new_title.is_empty());

        panel.new_title = "Glass".to_string();
        let second = panel.take_new_job().unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(second.required_vehicle, None);
    }
}
