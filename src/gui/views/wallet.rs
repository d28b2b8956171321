//! Panels shared by the transaction views: the Ledger account with its
//! ledger snapshot, the workflow error banner, and the transaction widget.

use crate::config::get_account_explorer_url;
use crate::gui::app::GuiApp;
use crate::gui::notifications::NotificationEntry;
use crate::gui::widgets::{outcome_explorer_url, TransactionCommand};
use crate::workflow::Action;
use eframe::egui::{self, RichText};

impl GuiApp {
    pub(crate) fn render_account_panel(&mut self, ui: &mut egui::Ui) {
        let pending = self.pending_action();
        self.theme.frame_panel().show(ui, |ui| {
            ui.set_min_width(ui.available_width());
            ui.horizontal(|ui| {
                ui.label(RichText::new("[L] Ledger Account").size(16.0).strong().color(self.theme.text_primary));
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let idle = !self.workflow.is_busy();
                    if ui
                        .add_enabled(idle && self.workflow.account().is_some(), self.theme.button_small("[R] Refresh"))
                        .on_hover_text("Fetch the account's latest validated state")
                        .clicked()
                    {
                        self.start_fetch_ledger_state();
                    }
                    let connect_label = if self.workflow.account().is_some() { "Reconnect" } else { "Connect Ledger" };
                    if ui.add_enabled(idle, self.theme.button_primary(connect_label)).clicked() {
                        self.start_fetch_account();
                    }
                });
            });
            ui.add_space(self.theme.spacing_sm);

            match pending {
                Some((Action::FetchAccount, elapsed)) => {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label(
                            RichText::new(format!(
                                "Confirm the address on your Ledger... {}s (times out after {}s)",
                                elapsed.as_secs(),
                                self.config.device_timeout.as_secs()
                            ))
                            .color(self.theme.warning),
                        );
                    });
                }
                Some((Action::FetchLedgerState, _)) => {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label(RichText::new("Fetching account state...").color(self.theme.warning));
                    });
                }
                _ => {}
            }

            let Some(account) = self.workflow.account() else {
                ui.label(
                    RichText::new(format!(
                        "Open the XRP app on your Ledger, then connect. Path: {}",
                        self.config.get_derivation_path()
                    ))
                    .color(self.theme.text_secondary),
                );
                return;
            };

            let mut open_explorer = None;
            egui::Grid::new("account_grid")
                .num_columns(2)
                .spacing([self.theme.spacing_md, self.theme.spacing_xs])
                .show(ui, |ui| {
                    ui.label(RichText::new("Address:").color(self.theme.text_secondary));
                    ui.horizontal(|ui| {
                        ui.monospace(RichText::new(&account.address).color(self.theme.accent_green));
                        if ui.add(egui::Button::new("📋").small()).on_hover_text("Copy address").clicked() {
                            ui.output_mut(|o| o.copied_text = account.address.clone());
                        }
                        if ui.link(RichText::new("explorer").small().color(self.theme.accent_blue)).clicked() {
                            open_explorer = get_account_explorer_url(&self.config.network_key, &account.address);
                        }
                    });
                    ui.end_row();

                    ui.label(RichText::new("Path:").color(self.theme.text_secondary));
                    ui.monospace(&account.derivation_path);
                    ui.end_row();

                    ui.label(RichText::new("Public key:").color(self.theme.text_secondary));
                    ui.monospace(RichText::new(account.public_key.to_uppercase()).small());
                    ui.end_row();

                    if let Some(state) = self.workflow.ledger_state() {
                        ui.label(RichText::new("Balance:").color(self.theme.text_secondary));
                        ui.label(
                            RichText::new(format!("{} XRP", state.balance_xrp()))
                                .strong()
                                .color(self.theme.success),
                        );
                        ui.end_row();

                        ui.label(RichText::new("Sequence:").color(self.theme.text_secondary));
                        ui.label(state.sequence.to_string());
                        ui.end_row();

                        ui.label(RichText::new("Owned objects:").color(self.theme.text_secondary));
                        ui.label(state.owner_count.to_string());
                        ui.end_row();

                        if let Some(ledger) = state.ledger_index {
                            ui.label(RichText::new("As of ledger:").color(self.theme.text_secondary));
                            ui.label(ledger.to_string());
                            ui.end_row();
                        }
                    }
                });

            if let Some(url) = open_explorer {
                self.open_url(&url);
            }
        });
    }

    pub(crate) fn render_workflow_error(&mut self, ui: &mut egui::Ui) {
        let Some(message) = self.workflow.error_message() else {
            return;
        };
        ui.add_space(self.theme.spacing_sm);
        ui.horizontal_wrapped(|ui| {
            ui.colored_label(self.theme.error, format!("[XX] {}", message));
            if ui.add(self.theme.button_small("Dismiss")).clicked() {
                self.workflow.clear_error();
            }
        });
    }

    pub(crate) fn render_transaction_panel(&mut self, ui: &mut egui::Ui) {
        let pending = self.pending_action();
        let command = self.tx_view.show(ui, &self.theme, &self.workflow, pending);
        match command {
            Some(TransactionCommand::Sign) => self.start_sign(),
            Some(TransactionCommand::Submit) => self.start_submit(),
            Some(TransactionCommand::OpenExplorer) => {
                if let Some(url) = outcome_explorer_url(&self.workflow, &self.config.network_key) {
                    self.open_url(&url);
                }
            }
            None => {}
        }
    }

    pub(crate) fn open_url(&mut self, url: &str) {
        if let Err(e) = open::that(url) {
            self.notify(NotificationEntry::error(format!("Failed to open URL: {}", e)));
        }
    }
}
