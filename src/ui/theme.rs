use egui::{Color32, FontFamily, FontId, Rounding, Stroke, Style, TextStyle, Visuals};

use crate::board::{ColorSlot, PALETTE_SIZE};

/// Font family for filled Phosphor icons
pub fn phosphor_fill_family() -> FontFamily {
    FontFamily::Name("phosphor-fill".into())
}

pub fn setup_fonts(ctx: &egui::Context) {
    let mut fonts = egui::FontDefinitions::default();

    // Phosphor Regular icons as fallback in the Proportional family
    egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);

    // Phosphor Fill as its own family, falling back to the proportional fonts so text still renders
    fonts.font_data.insert(
        "phosphor-fill".into(),
        egui_phosphor::Variant::Fill.font_data(),
    );
    let mut fill_family = vec!["phosphor-fill".to_owned()];
    if let Some(proportional) = fonts.families.get(&FontFamily::Proportional) {
        fill_family.extend(proportional.iter().cloned());
    }
    fonts.families.insert(phosphor_fill_family(), fill_family);

    ctx.set_fonts(fonts);
}

pub fn setup_theme(ctx: &egui::Context) {
    let mut style = Style::default();

    let mut visuals = Visuals::dark();

    let bg = Color32::BLACK;
    visuals.panel_fill = bg;
    visuals.window_fill = bg;
    visuals.faint_bg_color = Color32::from_rgb(20, 20, 18);
    visuals.extreme_bg_color = Color32::from_rgb(12, 12, 11);

    // Widget colors - warm grays
    visuals.widgets.noninteractive.bg_fill = Color32::from_rgb(40, 40, 38);
    visuals.widgets.noninteractive.fg_stroke = Stroke::new(1.0, Color32::from_rgb(176, 176, 168));

    visuals.widgets.inactive.bg_fill = Color32::from_rgb(56, 56, 52);
    visuals.widgets.inactive.fg_stroke = Stroke::new(1.0, Color32::from_rgb(200, 200, 192));

    visuals.widgets.hovered.bg_fill = Color32::from_rgb(80, 80, 74);
    visuals.widgets.hovered.fg_stroke = Stroke::new(1.0, Color32::from_rgb(255, 255, 255));

    let accent = accent_color();
    visuals.widgets.active.bg_fill = accent;
    visuals.widgets.active.fg_stroke = Stroke::new(1.0, Color32::WHITE);

    visuals.selection.bg_fill = accent;
    visuals.selection.stroke = Stroke::new(1.0, Color32::WHITE);
    visuals.hyperlink_color = accent;

    visuals.widgets.noninteractive.rounding = Rounding::same(6.0);
    visuals.widgets.inactive.rounding = Rounding::same(6.0);
    visuals.widgets.hovered.rounding = Rounding::same(6.0);
    visuals.widgets.active.rounding = Rounding::same(6.0);
    visuals.window_rounding = Rounding::same(8.0);

    style.visuals = visuals;

    style.text_styles = [
        (TextStyle::Small, FontId::new(12.0, FontFamily::Proportional)),
        (TextStyle::Body, FontId::new(14.0, FontFamily::Proportional)),
        (TextStyle::Button, FontId::new(14.0, FontFamily::Proportional)),
        (TextStyle::Heading, FontId::new(16.0, FontFamily::Proportional)),
        (TextStyle::Monospace, FontId::new(14.0, FontFamily::Monospace)),
    ]
    .into();

    style.spacing.item_spacing = egui::vec2(10.0, 8.0);
    style.spacing.button_padding = egui::vec2(14.0, 6.0);
    style.spacing.window_margin = egui::Margin::same(20.0);

    ctx.set_style(style);
}

pub fn accent_color() -> Color32 {
    Color32::from_rgb(19, 152, 244)
}

pub fn error_color() -> Color32 {
    Color32::from_rgb(224, 108, 117)
}

pub fn ok_color() -> Color32 {
    Color32::from_rgb(152, 195, 121)
}

pub fn warning_color() -> Color32 {
    Color32::from_rgb(229, 170, 0)
}

/// Base colors for driver columns, indexed by `ColorSlot::palette_index`
const PALETTE: [(u8, u8, u8); PALETTE_SIZE] = [
    (0x13, 0x98, 0xf4), // blue
    (0x2e, 0xb8, 0x72), // green
    (0xec, 0x71, 0x1b), // orange
    (0xa3, 0x5c, 0xe8), // purple
    (0xe8, 0x28, 0x71), // pink
    (0x1b, 0xb8, 0xc4), // teal
    (0xe5, 0xaa, 0x00), // gold
    (0x8a, 0x8a, 0x80), // gray
];

/// Returns (block_bg, accent) for a job block
pub fn job_colors(slot: ColorSlot) -> (Color32, Color32) {
    let (r, g, b) = PALETTE[slot.palette_index % PALETTE_SIZE];
    let accent = Color32::from_rgb(r, g, b);
    // Alternate blocks get a darker wash so neighbours stay distinguishable
    let wash = if slot.alternate { 0.18 } else { 0.30 };
    let bg = Color32::from_rgb(
        (r as f32 * wash) as u8,
        (g as f32 * wash) as u8,
        (b as f32 * wash) as u8,
    );
    (bg, accent)
}

/// Parse a driver's "#rrggbb" display color
pub fn parse_hex_color(hex: &str) -> Option<Color32> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some(Color32::from_rgb(channel(0)?, channel(2)?, channel(4)?))
}

/// Returns (bg_color, text_color) for button-like elements
pub fn button_colors() -> (Color32, Color32) {
    (
        Color32::from_rgb(56, 56, 52),
        Color32::from_rgb(200, 200, 192),
    )
}

/// Returns (content_bg, frame_color, frame_text) for dialogs
pub fn dialog_colors() -> (Color32, Color32, Color32) {
    (
        Color32::BLACK,
        Color32::from_rgb(40, 40, 38),
        Color32::from_rgb(176, 176, 168),
    )
}

/// Returns (bg_color, text_color, secondary_text_color) for pending job cards
pub fn card_colors() -> (Color32, Color32, Color32) {
    (
        Color32::from_rgb(0x1c, 0x1c, 0x1a),
        Color32::WHITE,
        Color32::from_rgb(208, 208, 200),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_driver_colors() {
        assert_eq!(parse_hex_color("#ff8000"), Some(Color32::from_rgb(255, 128, 0)));
        assert_eq!(parse_hex_color("ff8000"), None);
        assert_eq!(parse_hex_color("#ff80"), None);
        assert_eq!(parse_hex_color("#gg0000"), None);
        assert_eq!(parse_hex_color(""), None);
    }

    #[test]
    fn alternate_shades_differ() {
        let plain = job_colors(ColorSlot { palette_index: 3, alternate: false });
        let alternate = job_colors(ColorSlot { palette_index: 3, alternate: true });
        assert_eq!(plain.1, alternate.1);
        assert_ne!(plain.0, alternate.0);
    }
}
