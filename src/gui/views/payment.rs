//! Payment view: connect, draft an XRP payment, sign it on the device, submit it.

use crate::gui::app::GuiApp;
use crate::workflow::WorkflowStage;
use eframe::egui::{self, RichText};

impl GuiApp {
    pub(crate) fn view_payment(&mut self, ui: &mut egui::Ui) {
        self.render_section_header(ui, "[$]", "SEND XRP");
        ui.add_space(self.theme.spacing_md);

        self.render_account_panel(ui);
        ui.add_space(self.theme.spacing_md);

        let can_draft = !self.workflow.is_busy() && self.workflow.stage() != WorkflowStage::Idle
            && self.workflow.ledger_state().is_some();

        let mut draft_clicked = false;
        self.theme.frame_panel().show(ui, |ui| {
            ui.set_min_width(ui.available_width());
            ui.label(RichText::new("[>] Payment").size(16.0).strong().color(self.theme.text_primary));
            ui.add_space(self.theme.spacing_sm);

            let field_width = ui.available_width().min(420.0);
            egui::Grid::new("payment_form_grid")
                .num_columns(2)
                .spacing([self.theme.spacing_md, self.theme.spacing_sm])
                .show(ui, |ui| {
                    ui.label("Destination:");
                    ui.add(
                        egui::TextEdit::singleline(&mut self.payment_form.destination)
                            .hint_text("r...")
                            .desired_width(field_width),
                    );
                    ui.end_row();

                    ui.label("Amount (XRP):");
                    ui.add(
                        egui::TextEdit::singleline(&mut self.payment_form.amount)
                            .hint_text("0.000000")
                            .desired_width(160.0),
                    );
                    ui.end_row();

                    ui.label("Destination tag:");
                    ui.add(
                        egui::TextEdit::singleline(&mut self.payment_form.destination_tag)
                            .hint_text("optional")
                            .desired_width(160.0),
                    );
                    ui.end_row();
                });

            ui.add_space(self.theme.spacing_sm);
            ui.horizontal(|ui| {
                if ui.add_enabled(can_draft, self.theme.button_primary("Create Transaction")).clicked() {
                    draft_clicked = true;
                }
                ui.label(
                    RichText::new(format!("Fee: {} drops", self.workflow.fee_drops()))
                        .small()
                        .color(self.theme.text_secondary),
                );
            });
        });
        if draft_clicked {
            self.draft_payment();
        }

        self.render_workflow_error(ui);
        ui.add_space(self.theme.spacing_md);
        self.render_transaction_panel(ui);
    }
}
