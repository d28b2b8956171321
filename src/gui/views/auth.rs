//! Auth token view: a JWT for the connected account, signed on the Ledger.

use crate::auth_token::decode_claims;
use crate::gui::app::GuiApp;
use eframe::egui::{self, RichText};

impl GuiApp {
    pub(crate) fn view_auth_token(&mut self, ui: &mut egui::Ui) {
        self.render_section_header(ui, "[K]", "AUTH TOKEN");
        ui.add_space(self.theme.spacing_md);

        self.render_account_panel(ui);
        ui.add_space(self.theme.spacing_md);

        let signing = self.token.job.is_some();
        let can_issue = !signing && !self.workflow.is_busy() && self.workflow.account().is_some();
        let mut issue_clicked = false;

        self.theme.frame_panel().show(ui, |ui| {
            ui.set_min_width(ui.available_width());
            ui.label(RichText::new("[J] Sign a JSON Web Token").size(16.0).strong().color(self.theme.text_primary));
            ui.add_space(self.theme.spacing_sm);

            egui::Grid::new("token_form_grid")
                .num_columns(2)
                .spacing([self.theme.spacing_md, self.theme.spacing_sm])
                .show(ui, |ui| {
                    ui.label("Audience:");
                    let width = ui.available_width().min(420.0);
                    ui.add(
                        egui::TextEdit::singleline(&mut self.token.audience)
                            .hint_text("optional, e.g. https://service.example")
                            .desired_width(width),
                    );
                    ui.end_row();

                    ui.label("Lifetime (minutes):");
                    ui.add(egui::DragValue::new(&mut self.token.ttl_minutes).speed(1).clamp_range(1..=10_080));
                    ui.end_row();
                });

            ui.add_space(self.theme.spacing_sm);
            ui.horizontal(|ui| {
                if ui.add_enabled(can_issue, self.theme.button_primary("Sign Token")).clicked() {
                    issue_clicked = true;
                }
                if signing {
                    ui.spinner();
                    ui.label(RichText::new("Confirm the message on your Ledger...").color(self.theme.warning));
                }
            });

            if let Some(err) = &self.token.error {
                ui.colored_label(self.theme.error, format!("[XX] {}", err));
            }

            if let Some(token) = &self.token.token {
                ui.add_space(self.theme.spacing_md);
                ui.horizontal(|ui| {
                    ui.label(RichText::new("Token").strong());
                    if ui.add(egui::Button::new("📋").small()).on_hover_text("Copy token").clicked() {
                        ui.output_mut(|o| o.copied_text = token.clone());
                    }
                });
                let mut shown = token.as_str();
                ui.add(
                    egui::TextEdit::multiline(&mut shown)
                        .font(egui::TextStyle::Monospace)
                        .desired_width(f32::INFINITY)
                        .desired_rows(4),
                );

                if let Some(claims) = decode_claims(token) {
                    ui.add_space(self.theme.spacing_sm);
                    egui::Grid::new("token_claims_grid")
                        .num_columns(2)
                        .spacing([self.theme.spacing_md, self.theme.spacing_xs])
                        .show(ui, |ui| {
                            ui.label(RichText::new("Subject:").color(self.theme.text_secondary));
                            ui.label(&claims.sub);
                            ui.end_row();
                            if let Some(aud) = &claims.aud {
                                ui.label(RichText::new("Audience:").color(self.theme.text_secondary));
                                ui.label(aud);
                                ui.end_row();
                            }
                            ui.label(RichText::new("Expires:").color(self.theme.text_secondary));
                            let expires = chrono::DateTime::from_timestamp(claims.exp, 0)
                                .map(|t| t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M").to_string())
                                .unwrap_or_else(|| claims.exp.to_string());
                            ui.label(expires);
                            ui.end_row();
                        });
                }
            }
        });

        if issue_clicked {
            self.start_issue_token();
        }
    }
}
