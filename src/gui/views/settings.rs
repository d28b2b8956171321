//! Settings view: network, RPC endpoint, derivation indexes, curve and fee.
//!
//! Edits go into `GuiApp::pending` and take effect on Apply.

use crate::config::{derivation_path, NETWORKS};
use crate::gui::app::GuiApp;
use eframe::egui::{self, RichText};

impl GuiApp {
    pub(crate) fn view_settings(&mut self, ui: &mut egui::Ui) {
        self.render_section_header(ui, "[*]", "SETTINGS");
        ui.add_space(self.theme.spacing_md);

        // Network
        self.theme.frame_panel().show(ui, |ui| {
            ui.set_min_width(ui.available_width());
            ui.label(RichText::new("[@] Network").size(16.0).strong().color(self.theme.text_primary));
            ui.add_space(self.theme.spacing_sm);

            let selected_label = NETWORKS
                .get(self.pending.network_index)
                .map(|n| n.label)
                .unwrap_or("Unknown");
            egui::ComboBox::from_id_source("settings_network")
                .selected_text(selected_label)
                .width(220.0)
                .show_ui(ui, |ui| {
                    for (idx, network) in NETWORKS.iter().enumerate() {
                        ui.selectable_value(&mut self.pending.network_index, idx, network.label);
                    }
                });

            ui.add_space(self.theme.spacing_xs);
            ui.checkbox(&mut self.pending.use_custom_rpc, "Use a custom JSON-RPC endpoint");
            if self.pending.use_custom_rpc {
                ui.add(
                    egui::TextEdit::singleline(&mut self.pending.custom_rpc)
                        .hint_text("https://my-rippled:51234/")
                        .desired_width(420.0),
                );
            } else if let Some(network) = NETWORKS.get(self.pending.network_index) {
                ui.label(RichText::new(network.default_rpc).small().color(self.theme.text_secondary));
            }
        });
        ui.add_space(self.theme.spacing_md);

        // Ledger key
        self.theme.frame_panel().show(ui, |ui| {
            ui.set_min_width(ui.available_width());
            ui.label(RichText::new("[L] Ledger Key").size(16.0).strong().color(self.theme.text_primary));
            ui.add_space(self.theme.spacing_sm);

            egui::Grid::new("settings_key_grid")
                .num_columns(2)
                .spacing([self.theme.spacing_md, self.theme.spacing_sm])
                .show(ui, |ui| {
                    ui.label("Account index:");
                    ui.add(egui::DragValue::new(&mut self.pending.account_index).speed(1).clamp_range(0..=1_000));
                    ui.end_row();

                    ui.label("Key index:");
                    ui.add(egui::DragValue::new(&mut self.pending.key_index).speed(1).clamp_range(0..=100_000));
                    ui.end_row();

                    ui.label("Path:");
                    ui.monospace(derivation_path(self.pending.account_index, self.pending.key_index));
                    ui.end_row();

                    ui.label("Curve:");
                    ui.horizontal(|ui| {
                        ui.radio_value(&mut self.pending.ed25519, false, "secp256k1");
                        ui.radio_value(&mut self.pending.ed25519, true, "ed25519");
                    });
                    ui.end_row();
                });
            ui.label(
                RichText::new(format!(
                    "The device has {}s to answer an address request.",
                    self.config.device_timeout.as_secs()
                ))
                .small()
                .color(self.theme.text_secondary),
            );
        });
        ui.add_space(self.theme.spacing_md);

        // Transactions
        self.theme.frame_panel().show(ui, |ui| {
            ui.set_min_width(ui.available_width());
            ui.label(RichText::new("[$] Transactions").size(16.0).strong().color(self.theme.text_primary));
            ui.add_space(self.theme.spacing_sm);

            egui::Grid::new("settings_tx_grid")
                .num_columns(2)
                .spacing([self.theme.spacing_md, self.theme.spacing_sm])
                .show(ui, |ui| {
                    ui.label("Fee (drops):");
                    ui.add(egui::DragValue::new(&mut self.pending.fee_drops).speed(1).clamp_range(10..=1_000_000));
                    ui.end_row();

                    ui.label("Validation timeout:");
                    ui.label(format!("{}s", self.config.validation_timeout.as_secs()));
                    ui.end_row();
                });
        });
        ui.add_space(self.theme.spacing_md);

        ui.horizontal(|ui| {
            if ui.add(self.theme.button_success("Apply")).clicked() {
                self.apply_settings();
            }
            ui.label(
                RichText::new("Changing the network, key or curve clears the current account and draft.")
                    .small()
                    .color(self.theme.text_secondary),
            );
        });
    }
}
