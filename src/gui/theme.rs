//! Theme and styling for the GUI
//!
//! AppTheme holds the palette, spacing scale and styled widget factories the
//! views share.

use eframe::egui;

#[derive(Clone, Copy)]
pub struct AppTheme {
    // Base colors
    pub background: egui::Color32,
    pub surface: egui::Color32,
    pub surface_hover: egui::Color32,
    pub surface_active: egui::Color32,
    pub panel_fill: egui::Color32,
    pub text_primary: egui::Color32,
    pub text_secondary: egui::Color32,

    // Semantic colors
    pub primary: egui::Color32,
    pub secondary: egui::Color32,
    pub success: egui::Color32,
    pub warning: egui::Color32,
    pub error: egui::Color32,

    // Accents
    pub accent_blue: egui::Color32,
    pub accent_green: egui::Color32,
    pub accent_orange: egui::Color32,

    // Spacing scale
    pub spacing_xs: f32,
    pub spacing_sm: f32,
    pub spacing_md: f32,
    pub spacing_lg: f32,

    pub button_small: egui::Vec2,
    pub button_medium: egui::Vec2,
}

impl Default for AppTheme {
    fn default() -> Self {
        Self {
            // Dark slate with ice-blue text
            background: egui::Color32::from_rgb(10, 12, 16),
            surface: egui::Color32::from_rgb(18, 21, 27),
            surface_hover: egui::Color32::from_rgb(28, 33, 42),
            surface_active: egui::Color32::from_rgb(40, 46, 58),
            panel_fill: egui::Color32::from_rgb(14, 17, 22),
            text_primary: egui::Color32::from_rgb(200, 230, 245),
            text_secondary: egui::Color32::from_rgb(140, 150, 165),

            primary: egui::Color32::from_rgb(35, 170, 230),
            secondary: egui::Color32::from_rgb(70, 78, 92),
            success: egui::Color32::from_rgb(60, 210, 140),
            warning: egui::Color32::from_rgb(250, 180, 40),
            error: egui::Color32::from_rgb(250, 90, 90),

            accent_blue: egui::Color32::from_rgb(90, 190, 250),
            accent_green: egui::Color32::from_rgb(60, 210, 140),
            accent_orange: egui::Color32::from_rgb(250, 150, 50),

            spacing_xs: 6.0,
            spacing_sm: 12.0,
            spacing_md: 20.0,
            spacing_lg: 28.0,

            button_small: egui::vec2(100.0, 28.0),
            button_medium: egui::vec2(140.0, 36.0),
        }
    }
}

impl AppTheme {
    /// Main call-to-action button
    pub fn button_primary(&self, text: &str) -> egui::Button<'_> {
        egui::Button::new(egui::RichText::new(text).color(self.text_primary).strong())
            .fill(self.surface)
            .stroke(egui::Stroke::new(2.0, self.primary))
            .min_size(self.button_medium)
    }

    /// Button for the final, irreversible step (submit, apply)
    pub fn button_success(&self, text: &str) -> egui::Button<'_> {
        egui::Button::new(egui::RichText::new(text).color(self.text_primary).strong())
            .fill(self.surface)
            .stroke(egui::Stroke::new(2.0, self.success))
            .min_size(self.button_medium)
    }

    pub fn button_secondary(&self, text: &str) -> egui::Button<'_> {
        egui::Button::new(egui::RichText::new(text).color(self.text_primary))
            .fill(self.surface)
            .stroke(egui::Stroke::new(1.0, self.secondary))
            .min_size(self.button_medium)
    }

    pub fn button_small(&self, text: &str) -> egui::Button<'_> {
        egui::Button::new(egui::RichText::new(text).color(self.text_primary))
            .fill(self.secondary)
            .stroke(egui::Stroke::new(1.0, self.surface_active))
            .min_size(self.button_small)
    }

    pub fn frame_surface(&self) -> egui::Frame {
        egui::Frame::none()
            .fill(self.surface)
            .rounding(4.0)
            .inner_margin(self.spacing_md)
            .stroke(egui::Stroke::new(1.0, self.secondary))
    }

    /// Frame for the cards every view is built from
    pub fn frame_panel(&self) -> egui::Frame {
        egui::Frame::none()
            .fill(self.panel_fill)
            .rounding(4.0)
            .inner_margin(self.spacing_md)
            .stroke(egui::Stroke::new(1.5, self.primary))
    }

    /// Available width clamped to `[min, min(preferred, max)]`
    pub fn responsive_width(ui: &egui::Ui, min: f32, preferred: f32, max: f32) -> f32 {
        ui.available_width().clamp(min, max.min(preferred))
    }

    pub fn section_header_text(&self, icon: &str, title: &str) -> String {
        format!("  {} {}", icon, title)
    }
}

/// Apply the theme to the egui context
pub fn configure_style(ctx: &egui::Context, theme: &AppTheme) {
    let mut visuals = egui::Visuals::dark();
    visuals.window_fill = theme.background;
    visuals.panel_fill = theme.panel_fill;
    visuals.override_text_color = Some(theme.text_primary);

    visuals.widgets.noninteractive.bg_fill = theme.surface;
    visuals.widgets.inactive.bg_fill = theme.surface;
    visuals.widgets.hovered.bg_fill = theme.surface_hover;
    visuals.widgets.active.bg_fill = theme.surface_active;
    visuals.widgets.open.bg_fill = theme.surface_active;

    visuals.widgets.inactive.bg_stroke = egui::Stroke::new(1.0, theme.secondary);
    visuals.widgets.hovered.bg_stroke = egui::Stroke::new(1.5, theme.accent_blue);
    visuals.widgets.active.bg_stroke = egui::Stroke::new(2.0, theme.primary);
    visuals.selection.bg_fill = theme.surface_active;
    visuals.selection.stroke = egui::Stroke::new(1.0, theme.primary);

    ctx.set_visuals(visuals);

    let mut style = (*ctx.style()).clone();
    style.spacing.item_spacing = egui::vec2(8.0, 6.0);
    style.spacing.button_padding = egui::vec2(12.0, 8.0);
    style.spacing.menu_margin = egui::Margin::same(8.0);
    style.spacing.indent = 20.0;

    // Addresses and hex blobs read best in a fixed-width face
    for (text_style, size) in [
        (egui::TextStyle::Heading, 20.0),
        (egui::TextStyle::Body, 14.0),
        (egui::TextStyle::Button, 14.0),
        (egui::TextStyle::Monospace, 13.0),
        (egui::TextStyle::Small, 11.0),
    ] {
        style
            .text_styles
            .insert(text_style, egui::FontId::new(size, egui::FontFamily::Monospace));
    }

    ctx.set_style(style);
}
