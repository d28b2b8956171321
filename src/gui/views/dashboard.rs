//! Dashboard view implementation
//!
//! Network status, a summary of the workflow, recent notifications and the
//! about panel.

use crate::gui::app::{GuiApp, GuiSection};
use crate::gui::theme::AppTheme;
use eframe::egui::{self, RichText};

impl GuiApp {
    /// Main dashboard view
    pub(crate) fn view_dashboard(&mut self, ui: &mut egui::Ui) {
        self.render_section_header(ui, "[H]", "DASHBOARD");
        ui.add_space(self.theme.spacing_md);

        self.render_network_status_panel(ui);
        ui.add_space(self.theme.spacing_md);

        self.render_workflow_summary_panel(ui);
        ui.add_space(self.theme.spacing_md);

        self.theme.frame_panel().show(ui, |ui| {
            ui.set_min_width(ui.available_width());
            ui.label(RichText::new("[#] Recent Activity").size(16.0).strong().color(self.theme.text_primary));
            ui.add_space(self.theme.spacing_sm);
            self.render_notification_list(ui, 8);
        });
        ui.add_space(self.theme.spacing_lg);

        self.theme.frame_panel().show(ui, |ui| {
            ui.label(RichText::new("About Ledger Pay").size(16.0).strong().color(self.theme.text_primary));
            ui.add_space(self.theme.spacing_sm);
            egui::Grid::new("about_grid")
                .num_columns(2)
                .spacing([self.theme.spacing_md, self.theme.spacing_xs])
                .show(ui, |ui| {
                    ui.label(RichText::new("Version:").color(self.theme.text_secondary));
                    ui.label(RichText::new(env!("CARGO_PKG_VERSION")).strong().color(self.theme.accent_green));
                    ui.end_row();

                    ui.label(RichText::new("Device app:").color(self.theme.text_secondary));
                    ui.label("XRP (Ledger Nano S / S Plus / X)");
                    ui.end_row();
                });
            ui.add_space(self.theme.spacing_sm);
            ui.label(
                RichText::new("Keys never leave the device. Every transaction is confirmed on the Ledger screen.")
                    .small()
                    .color(self.theme.text_secondary),
            );
        });
    }

    /// Render a consistent section header with retro ASCII styling
    pub(crate) fn render_section_header(&self, ui: &mut egui::Ui, icon: &str, title: &str) {
        let header_text = self.theme.section_header_text(icon, title);
        let separator = "=".repeat(40);

        ui.label(RichText::new(&separator).size(14.0).color(self.theme.primary));
        ui.label(RichText::new(&header_text).size(24.0).strong().color(self.theme.text_primary));
        ui.label(RichText::new(&separator).size(14.0).color(self.theme.primary));
    }

    fn render_network_status_panel(&mut self, ui: &mut egui::Ui) {
        let panel_width = AppTheme::responsive_width(ui, 300.0, 700.0, 900.0);
        self.theme.frame_panel().show(ui, |ui| {
            ui.set_min_width(panel_width);
            ui.horizontal(|ui| {
                ui.label(RichText::new("[@] Network Status").size(16.0).strong().color(self.theme.text_primary));
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let is_checking = self.server.job.is_some();
                    if ui
                        .add_enabled(!is_checking, egui::Button::new(if is_checking { "⏳" } else { "🔄" }).small())
                        .on_hover_text("Check RPC connection")
                        .clicked()
                    {
                        self.start_server_check();
                    }

                    if is_checking {
                        ui.label(RichText::new("Checking...").small().color(self.theme.warning));
                    } else if let Some(latency) = self.server.latency_ms {
                        let (status_color, status_text) = if latency < 300 {
                            (self.theme.success, format!("🟢 {}ms", latency))
                        } else if latency < 1500 {
                            (self.theme.warning, format!("🟡 {}ms", latency))
                        } else {
                            (self.theme.error, format!("🔴 {}ms", latency))
                        };
                        ui.label(RichText::new(status_text).small().color(status_color));
                    } else if self.server.error.is_some() {
                        ui.label(RichText::new("🔴 unreachable").small().color(self.theme.error));
                    }
                });
            });
            ui.add_space(self.theme.spacing_sm);

            egui::Grid::new("network_status_grid")
                .num_columns(2)
                .spacing([self.theme.spacing_md, self.theme.spacing_xs])
                .show(ui, |ui| {
                    ui.label(RichText::new("Network:").color(self.theme.text_secondary));
                    ui.label(RichText::new(self.config.network_label()).strong().color(self.theme.accent_green));
                    ui.end_row();

                    ui.label(RichText::new("RPC:").color(self.theme.text_secondary));
                    ui.horizontal(|ui| {
                        ui.label(RichText::new(&self.config.rpc_url).small().color(self.theme.accent_green));
                        if ui.add(egui::Button::new("📋").small()).on_hover_text("Copy RPC URL").clicked() {
                            ui.output_mut(|o| o.copied_text = self.config.rpc_url.clone());
                        }
                    });
                    ui.end_row();

                    if let Some(status) = &self.server.status {
                        ui.label(RichText::new("Server state:").color(self.theme.text_secondary));
                        ui.label(RichText::new(&status.server_state).color(self.theme.accent_green));
                        ui.end_row();

                        ui.label(RichText::new("rippled:").color(self.theme.text_secondary));
                        ui.label(&status.build_version);
                        ui.end_row();

                        ui.label(RichText::new("Validated ledger:").color(self.theme.text_secondary));
                        ui.label(status.validated_ledger.map(|l| l.to_string()).unwrap_or_else(|| "-".into()));
                        ui.end_row();
                    }
                });

            if let Some(err) = &self.server.error {
                ui.add_space(self.theme.spacing_xs);
                ui.colored_label(self.theme.error, format!("[XX] {}", err));
            }

            ui.add_space(self.theme.spacing_sm);
            ui.horizontal(|ui| {
                ui.label(RichText::new("Need to change settings?").small().color(self.theme.text_secondary));
                if ui.link(RichText::new("Go to Settings").small().color(self.theme.accent_blue)).clicked() {
                    self.section = GuiSection::Settings;
                }
            });
        });
    }

    fn render_workflow_summary_panel(&mut self, ui: &mut egui::Ui) {
        self.theme.frame_panel().show(ui, |ui| {
            ui.set_min_width(ui.available_width());
            ui.label(RichText::new("[L] Wallet").size(16.0).strong().color(self.theme.text_primary));
            ui.add_space(self.theme.spacing_sm);

            egui::Grid::new("wallet_summary_grid")
                .num_columns(2)
                .spacing([self.theme.spacing_md, self.theme.spacing_xs])
                .show(ui, |ui| {
                    ui.label(RichText::new("Stage:").color(self.theme.text_secondary));
                    ui.label(RichText::new(self.workflow.stage().label()).color(self.theme.accent_green));
                    ui.end_row();

                    ui.label(RichText::new("Path:").color(self.theme.text_secondary));
                    ui.monospace(self.config.get_derivation_path());
                    ui.end_row();

                    if let Some(account) = self.workflow.account() {
                        ui.label(RichText::new("Account:").color(self.theme.text_secondary));
                        ui.monospace(&account.address);
                        ui.end_row();
                    }
                    if let Some(state) = self.workflow.ledger_state() {
                        ui.label(RichText::new("Balance:").color(self.theme.text_secondary));
                        ui.label(RichText::new(format!("{} XRP", state.balance_xrp())).color(self.theme.success));
                        ui.end_row();
                    }
                });

            ui.add_space(self.theme.spacing_sm);
            ui.horizontal(|ui| {
                if ui.add(self.theme.button_secondary("Send XRP")).clicked() {
                    self.section = GuiSection::Payment;
                }
                if ui.add(self.theme.button_secondary("Mint NFT")).clicked() {
                    self.section = GuiSection::NftMint;
                }
            });
        });
    }
}
