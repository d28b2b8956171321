//! Transaction view component for the GUI
//! Shows the current draft, its signature state, and the last submission outcome

use crate::config::get_tx_explorer_url;
use crate::gui::theme::AppTheme;
use crate::network::SubmissionResult;
use crate::workflow::{Action, PaymentWorkflow, WorkflowStage};
use eframe::egui::{self, RichText};
use std::time::Duration;

/// What the user asked the widget to do this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionCommand {
    Sign,
    Submit,
    OpenExplorer,
}

/// State for the transaction view widget
#[derive(Default)]
pub struct TransactionView {
    /// Show the draft as raw JSON instead of a field grid
    show_raw_json: bool,
}

impl TransactionView {
    /// Render the draft and its controls.
    ///
    /// `pending` is the in-flight workflow action and how long it has run.
    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        theme: &AppTheme,
        workflow: &PaymentWorkflow,
        pending: Option<(Action, Duration)>,
    ) -> Option<TransactionCommand> {
        let mut command = None;

        theme.frame_panel().show(ui, |ui| {
            ui.set_min_width(ui.available_width());
            ui.horizontal(|ui| {
                ui.label(RichText::new("[T] Transaction").size(16.0).strong().color(theme.text_primary));
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if workflow.draft().is_some() {
                        ui.checkbox(&mut self.show_raw_json, "Raw JSON");
                    }
                });
            });
            ui.add_space(theme.spacing_sm);

            match workflow.draft() {
                None => {
                    ui.label(RichText::new("No transaction drafted.").color(theme.text_secondary));
                }
                Some(draft) if self.show_raw_json => {
                    let json = serde_json::to_string_pretty(&draft.to_json()).unwrap_or_default();
                    ui.horizontal(|ui| {
                        if ui.add(egui::Button::new("📋").small()).on_hover_text("Copy JSON").clicked() {
                            ui.output_mut(|o| o.copied_text = json.clone());
                        }
                    });
                    ui.monospace(json);
                }
                Some(draft) => {
                    egui::Grid::new("draft_fields_grid")
                        .num_columns(2)
                        .spacing([theme.spacing_md, theme.spacing_xs])
                        .show(ui, |ui| {
                            if let serde_json::Value::Object(fields) = draft.to_json() {
                                for (name, value) in fields {
                                    ui.label(RichText::new(format!("{}:", name)).color(theme.text_secondary));
                                    let text = match value {
                                        serde_json::Value::String(s) => s,
                                        other => other.to_string(),
                                    };
                                    ui.label(RichText::new(short_hex(&text)).color(theme.accent_green))
                                        .on_hover_text(&text);
                                    ui.end_row();
                                }
                            }
                        });
                }
            }

            ui.add_space(theme.spacing_sm);
            if let Some(signature) = workflow.signature() {
                ui.label(
                    RichText::new(format!("Signed with {}", signature.derivation_path)).color(theme.success),
                );
            }

            ui.add_space(theme.spacing_sm);
            ui.horizontal(|ui| {
                let stage = workflow.stage();
                let idle = !workflow.is_busy();
                let can_sign = idle && matches!(stage, WorkflowStage::TxDrafted | WorkflowStage::TxSigned);
                if ui.add_enabled(can_sign, theme.button_primary("Sign on Ledger")).clicked() {
                    command = Some(TransactionCommand::Sign);
                }
                let can_submit = idle && stage == WorkflowStage::TxSigned;
                if ui.add_enabled(can_submit, theme.button_success("Submit")).clicked() {
                    command = Some(TransactionCommand::Submit);
                }
                match pending {
                    Some((Action::Sign, elapsed)) => {
                        ui.spinner();
                        ui.label(
                            RichText::new(format!("Waiting for approval on the device... {}s", elapsed.as_secs()))
                                .color(theme.warning),
                        );
                    }
                    Some((Action::Submit, elapsed)) => {
                        ui.spinner();
                        ui.label(
                            RichText::new(format!("Waiting for validation... {}s", elapsed.as_secs()))
                                .color(theme.warning),
                        );
                    }
                    _ => {}
                }
            });
        });

        if let Some(outcome) = workflow.outcome() {
            ui.add_space(theme.spacing_md);
            theme.frame_surface().show(ui, |ui| {
                ui.set_min_width(ui.available_width());
                match outcome {
                    Ok(result) => {
                        if render_submission(ui, theme, result) {
                            command = Some(TransactionCommand::OpenExplorer);
                        }
                    }
                    Err(e) => {
                        ui.colored_label(theme.error, format!("[XX] {}", e));
                    }
                }
            });
        }

        command
    }
}

/// Returns true when the explorer link was clicked
fn render_submission(ui: &mut egui::Ui, theme: &AppTheme, result: &SubmissionResult) -> bool {
    let (tag, color) = if result.succeeded() {
        ("[OK] Validated", theme.success)
    } else {
        ("[!!] Not successful", theme.error)
    };
    ui.label(RichText::new(tag).strong().color(color));
    ui.add_space(theme.spacing_xs);

    egui::Grid::new("submission_grid")
        .num_columns(2)
        .spacing([theme.spacing_md, theme.spacing_xs])
        .show(ui, |ui| {
            ui.label(RichText::new("Hash:").color(theme.text_secondary));
            ui.monospace(&result.hash);
            ui.end_row();

            ui.label(RichText::new("Preliminary:").color(theme.text_secondary));
            ui.label(format!("{} ({})", result.engine_result, result.engine_result_message));
            ui.end_row();

            ui.label(RichText::new("Result:").color(theme.text_secondary));
            ui.label(result.transaction_result.as_deref().unwrap_or("-"));
            ui.end_row();

            if let Some(ledger) = result.ledger_index {
                ui.label(RichText::new("Ledger:").color(theme.text_secondary));
                ui.label(ledger.to_string());
                ui.end_row();
            }
        });

    for warning in &result.warnings {
        ui.colored_label(theme.warning, format!("[!!] {}", warning));
    }

    ui.add_space(theme.spacing_xs);
    ui.link(RichText::new("View in explorer").color(theme.accent_blue)).clicked()
}

/// Explorer URL for the last successful submission
pub fn outcome_explorer_url(workflow: &PaymentWorkflow, network_key: &str) -> Option<String> {
    match workflow.outcome()? {
        Ok(result) => get_tx_explorer_url(network_key, &result.hash),
        Err(_) => None,
    }
}

/// Shorten long hex blobs for the field grid
fn short_hex(text: &str) -> String {
    if text.len() > 24 && text.chars().all(|c| c.is_ascii_hexdigit()) {
        format!("{}...{}", &text[..10], &text[text.len() - 8..])
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_hex() {
        let key = "03".repeat(33);
        let short = short_hex(&key);
        assert_eq!(short, format!("{}...{}", &key[..10], &key[58..]));
        assert_eq!(short_hex("rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh"), "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh");
        assert_eq!(short_hex("12"), "12");
    }

    #[test]
    fn test_no_explorer_link_without_outcome() {
        let workflow = PaymentWorkflow::default();
        assert!(outcome_explorer_url(&workflow, "testnet").is_none());
    }
}
