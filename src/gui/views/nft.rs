//! NFT mint view. Shares the account and transaction panels with payments.

use crate::gui::app::GuiApp;
use crate::workflow::MAX_TRANSFER_FEE;
use eframe::egui::{self, RichText};

impl GuiApp {
    pub(crate) fn view_nft_mint(&mut self, ui: &mut egui::Ui) {
        self.render_section_header(ui, "[N]", "MINT NFT");
        ui.add_space(self.theme.spacing_md);

        self.render_account_panel(ui);
        ui.add_space(self.theme.spacing_md);

        let can_draft = !self.workflow.is_busy() && self.workflow.ledger_state().is_some();
        let mut draft_clicked = false;
        self.theme.frame_panel().show(ui, |ui| {
            ui.set_min_width(ui.available_width());
            ui.label(RichText::new("[+] NFTokenMint").size(16.0).strong().color(self.theme.text_primary));
            ui.add_space(self.theme.spacing_sm);

            egui::Grid::new("nft_form_grid")
                .num_columns(2)
                .spacing([self.theme.spacing_md, self.theme.spacing_sm])
                .show(ui, |ui| {
                    ui.label("URI:");
                    let width = ui.available_width().min(420.0);
                    ui.add(
                        egui::TextEdit::singleline(&mut self.nft_form.uri)
                            .hint_text("ipfs://...")
                            .desired_width(width),
                    );
                    ui.end_row();

                    ui.label("Taxon:");
                    ui.add(
                        egui::TextEdit::singleline(&mut self.nft_form.taxon)
                            .hint_text("0")
                            .desired_width(120.0),
                    );
                    ui.end_row();

                    ui.label("Transferable:");
                    ui.checkbox(&mut self.nft_form.transferable, "");
                    ui.end_row();

                    ui.label("Transfer fee:");
                    ui.add_enabled(
                        self.nft_form.transferable,
                        egui::TextEdit::singleline(&mut self.nft_form.transfer_fee)
                            .hint_text(format!("0..{}", MAX_TRANSFER_FEE))
                            .desired_width(120.0),
                    )
                    .on_hover_text("In 1/100000 units; 50000 is 50%");
                    ui.end_row();
                });

            ui.add_space(self.theme.spacing_sm);
            if ui.add_enabled(can_draft, self.theme.button_primary("Create Mint")).clicked() {
                draft_clicked = true;
            }
        });
        if draft_clicked {
            self.draft_nft_mint();
        }

        self.render_workflow_error(ui);
        ui.add_space(self.theme.spacing_md);
        self.render_transaction_panel(ui);
    }
}
