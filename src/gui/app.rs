//! Main GUI application module
//!
//! Contains the GuiApp struct, job plumbing between the payment workflow and
//! the device/network, and the top-level panel layout.

use crate::{
    auth_token,
    config::{find_network_index, Config, NetworkCategory, NETWORKS},
    error::{NetworkError, SignerError},
    network::{AccountLedgerState, LedgerNetwork, ServerStatus, SubmissionResult, XrplClient},
    signer::{HardwareSigner, LedgerAccount, LedgerSigner, SignatureResult},
    workflow::{Action, NftMintForm, PaymentForm, PaymentWorkflow, SignRequest, SubmitRequest, Ticket},
};
use anyhow::{anyhow, Result};
use eframe::{egui, egui::RichText, App, Frame, NativeOptions};
use std::collections::VecDeque;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::runtime::Builder;

use super::async_job::{
    settle_account_job, settle_ledger_job, settle_sign_job, settle_submit_job, take_finished, AsyncJob,
    Settled, WorkflowJob,
};
use super::notifications::{failure_notice, push_notification, NotificationEntry};
use super::theme::{configure_style, AppTheme};
use super::widgets::TransactionView;

/// GUI section enum for navigation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuiSection {
    Dashboard,
    Payment,
    NftMint,
    AuthToken,
    Settings,
}

/// Result of a `server_info` round trip and how long it took
pub(crate) struct ServerCheck {
    pub(crate) status: Option<ServerStatus>,
    pub(crate) latency_ms: Option<u64>,
    pub(crate) error: Option<String>,
    pub(crate) job: Option<AsyncJob<(ServerStatus, u64)>>,
}

pub(crate) struct TokenState {
    pub(crate) audience: String,
    pub(crate) ttl_minutes: i64,
    pub(crate) token: Option<String>,
    pub(crate) error: Option<String>,
    pub(crate) job: Option<AsyncJob<std::result::Result<String, SignerError>>>,
}

impl Default for TokenState {
    fn default() -> Self {
        Self {
            audience: String::new(),
            ttl_minutes: auth_token::DEFAULT_TTL_MINUTES,
            token: None,
            error: None,
            job: None,
        }
    }
}

/// Values edited on the settings page before they are applied
#[derive(Clone)]
pub(crate) struct PendingSettings {
    pub(crate) network_index: usize,
    pub(crate) custom_rpc: String,
    pub(crate) use_custom_rpc: bool,
    pub(crate) account_index: u32,
    pub(crate) key_index: u32,
    pub(crate) fee_drops: u64,
    pub(crate) ed25519: bool,
}

pub struct GuiApp {
    pub(crate) config: Config,
    pub(crate) theme: AppTheme,
    pub(crate) section: GuiSection,
    pub(crate) notifications: VecDeque<NotificationEntry>,
    pub(crate) show_notifications_popup: bool,
    pub(crate) notification_toast_close_time: Option<Instant>,
    pub(crate) last_notification_count: usize,
    pub(crate) workflow: PaymentWorkflow,
    pub(crate) payment_form: PaymentForm,
    pub(crate) nft_form: NftMintForm,
    pub(crate) tx_view: TransactionView,
    pub(crate) token: TokenState,
    pub(crate) server: ServerCheck,
    pub(crate) network_index: usize,
    pub(crate) use_ed25519: bool,
    pub(crate) pending: PendingSettings,
    account_job: Option<WorkflowJob<std::result::Result<LedgerAccount, SignerError>>>,
    ledger_job: Option<WorkflowJob<std::result::Result<AccountLedgerState, NetworkError>>>,
    sign_job: Option<WorkflowJob<std::result::Result<SignatureResult, SignerError>>>,
    submit_job: Option<WorkflowJob<std::result::Result<SubmissionResult, NetworkError>>>,
}

impl GuiApp {
    fn new(config: Config, ctx: &egui::Context) -> Self {
        let theme = AppTheme::default();
        configure_style(ctx, &theme);

        let network_index = find_network_index(&config.network_key).unwrap_or(0);
        let use_custom_rpc = config.label_override.is_some();
        let pending = PendingSettings {
            network_index,
            custom_rpc: if use_custom_rpc { config.rpc_url.clone() } else { String::new() },
            use_custom_rpc,
            account_index: config.account_index,
            key_index: config.key_index,
            fee_drops: config.fee_drops,
            ed25519: false,
        };

        let mut app = Self {
            workflow: PaymentWorkflow::new(config.fee_drops),
            config,
            theme,
            section: GuiSection::Dashboard,
            notifications: VecDeque::with_capacity(20),
            show_notifications_popup: false,
            notification_toast_close_time: None,
            last_notification_count: 0,
            payment_form: PaymentForm::default(),
            nft_form: NftMintForm::default(),
            tx_view: TransactionView::default(),
            token: TokenState::default(),
            server: ServerCheck {
                status: None,
                latency_ms: None,
                error: None,
                job: None,
            },
            network_index,
            use_ed25519: false,
            pending,
            account_job: None,
            ledger_job: None,
            sign_job: None,
            submit_job: None,
        };
        app.start_server_check();
        app
    }

    pub(crate) fn spawn_job<T, FutBuilder, Fut>(&self, builder: FutBuilder) -> AsyncJob<T>
    where
        T: Send + 'static,
        FutBuilder: FnOnce() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<T>> + 'static,
    {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let result = match Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime.block_on(builder()),
                Err(e) => Err(anyhow!("Failed to create async runtime: {}", e)),
            };
            let _ = tx.send(result);
        });
        AsyncJob::new(rx)
    }

    pub(crate) fn notify(&mut self, entry: NotificationEntry) {
        push_notification(&mut self.notifications, entry);
    }

    /// Report the workflow's current error, if the last transition set one
    fn notify_workflow_error(&mut self, action: &str) {
        if let Some(error) = self.workflow.error().cloned() {
            self.notify(failure_notice(action, &error));
        }
    }

    fn signer(&self) -> LedgerSigner<crate::signer::HidXrpDevice> {
        LedgerSigner::hid(self.config.device_timeout).with_ed25519(self.use_ed25519)
    }

    // ---- Workflow actions ----

    pub(crate) fn start_fetch_account(&mut self) {
        let ticket = self.workflow.begin_fetch_account();
        let signer = self.signer();
        let (account_index, key_index) = (self.config.account_index, self.config.key_index);
        let job = self.spawn_job(move || async move {
            Ok(signer.get_account(account_index, key_index).await)
        });
        self.account_job = Some(WorkflowJob::new(ticket, job));
    }

    pub(crate) fn start_fetch_ledger_state(&mut self) {
        let (ticket, address) = match self.workflow.begin_fetch_ledger_state() {
            Ok(started) => started,
            Err(e) => {
                self.notify(failure_notice("Account lookup", &e));
                return;
            }
        };
        self.spawn_ledger_job(ticket, address);
    }

    fn spawn_ledger_job(&mut self, ticket: Ticket, address: String) {
        let config = self.config.clone();
        let job = self.spawn_job(move || async move {
            let client = XrplClient::from_config(&config)?;
            Ok(client.get_account_info(&address).await)
        });
        self.ledger_job = Some(WorkflowJob::new(ticket, job));
    }

    pub(crate) fn draft_payment(&mut self) {
        match self.workflow.draft_payment(&self.payment_form) {
            Ok(()) => self.notify(NotificationEntry::new("Payment drafted")),
            Err(e) => self.notify(failure_notice("Draft", &e)),
        }
    }

    pub(crate) fn draft_nft_mint(&mut self) {
        match self.workflow.draft_nft_mint(&self.nft_form) {
            Ok(()) => self.notify(NotificationEntry::new("NFT mint drafted")),
            Err(e) => self.notify(failure_notice("Draft", &e)),
        }
    }

    pub(crate) fn start_sign(&mut self) {
        let SignRequest {
            ticket,
            transaction,
            derivation_path,
        } = match self.workflow.begin_sign() {
            Ok(request) => request,
            Err(e) => {
                self.notify(failure_notice("Sign", &e));
                return;
            }
        };
        let signer = self.signer();
        let job = self.spawn_job(move || async move {
            Ok(signer.sign_transaction(&transaction, &derivation_path).await)
        });
        self.notify(NotificationEntry::new("Confirm the transaction on your Ledger"));
        self.sign_job = Some(WorkflowJob::new(ticket, job));
    }

    pub(crate) fn start_submit(&mut self) {
        let SubmitRequest {
            ticket,
            prepared,
            signature,
        } = match self.workflow.begin_submit() {
            Ok(request) => request,
            Err(e) => {
                self.notify(failure_notice("Submit", &e));
                return;
            }
        };
        let config = self.config.clone();
        let job = self.spawn_job(move || async move {
            let client = XrplClient::from_config(&config)?;
            Ok(client.submit_and_wait(&prepared, &signature).await)
        });
        self.submit_job = Some(WorkflowJob::new(ticket, job));
    }

    pub(crate) fn start_issue_token(&mut self) {
        let Some(account) = self.workflow.account().cloned() else {
            self.token.error = Some("Connect your Ledger and get the account first".into());
            return;
        };
        let signer = self.signer();
        let audience = Some(self.token.audience.clone());
        let ttl = chrono::Duration::minutes(self.token.ttl_minutes.max(1));
        self.token.error = None;
        self.token.job = Some(self.spawn_job(move || async move {
            Ok(auth_token::issue_token(&signer, &account, audience, ttl, chrono::Utc::now()).await)
        }));
    }

    pub(crate) fn start_server_check(&mut self) {
        let config = self.config.clone();
        self.server.job = Some(self.spawn_job(move || async move {
            let client = XrplClient::from_config(&config)?;
            let start = Instant::now();
            let status = client.server_info().await?;
            Ok((status, start.elapsed().as_millis() as u64))
        }));
    }

    /// What the workflow is waiting on, and for how long
    pub(crate) fn pending_action(&self) -> Option<(Action, Duration)> {
        let action = self.workflow.in_flight()?;
        let elapsed = match action {
            Action::FetchAccount => self.account_job.as_ref().map(|j| j.elapsed()),
            Action::FetchLedgerState => self.ledger_job.as_ref().map(|j| j.elapsed()),
            Action::Sign => self.sign_job.as_ref().map(|j| j.elapsed()),
            Action::Submit => self.submit_job.as_ref().map(|j| j.elapsed()),
        };
        Some((action, elapsed.unwrap_or_default()))
    }

    fn poll_jobs(&mut self) {
        if let Some((ticket, result)) = take_finished(&mut self.account_job) {
            match settle_account_job(&mut self.workflow, ticket, result) {
                Settled::Done((next, address)) => {
                    self.notify(NotificationEntry::success(format!("Ledger account {}", address)));
                    self.spawn_ledger_job(next, address);
                }
                Settled::Failed => self.notify_workflow_error("Connect Ledger"),
                Settled::Stale => {}
            }
        }

        if let Some((ticket, result)) = take_finished(&mut self.ledger_job) {
            match settle_ledger_job(&mut self.workflow, ticket, result) {
                Settled::Done(()) => {
                    if let Some(state) = self.workflow.ledger_state() {
                        let message = format!(
                            "Balance {} XRP, sequence {}",
                            state.balance_xrp(),
                            state.sequence
                        );
                        self.notify(NotificationEntry::new(message));
                    }
                }
                Settled::Failed => self.notify_workflow_error("Account lookup"),
                Settled::Stale => {}
            }
        }

        if let Some((ticket, result)) = take_finished(&mut self.sign_job) {
            match settle_sign_job(&mut self.workflow, ticket, result) {
                Settled::Done(()) => self.notify(NotificationEntry::success("Transaction signed")),
                Settled::Failed => self.notify_workflow_error("Sign"),
                Settled::Stale => {}
            }
        }

        if let Some((ticket, result)) = take_finished(&mut self.submit_job) {
            if settle_submit_job(&mut self.workflow, ticket, result) != Settled::Stale {
                let entry = match self.workflow.outcome() {
                    Some(Ok(submission)) if submission.succeeded() => NotificationEntry::success(
                        format!("Transaction {} validated", submission.hash),
                    ),
                    Some(Ok(submission)) => NotificationEntry::error(format!(
                        "Transaction {} finished with {}",
                        submission.hash,
                        submission
                            .transaction_result
                            .as_deref()
                            .unwrap_or(&submission.engine_result)
                    )),
                    Some(Err(e)) => failure_notice("Submit", e),
                    None => NotificationEntry::new("Submission finished"),
                };
                self.notify(entry);
            }
        }

        if let Some(job) = &mut self.token.job {
            if let Some(result) = job.poll() {
                self.token.job = None;
                match result.unwrap_or_else(|e| Err(SignerError::Device(e.to_string()))) {
                    Ok(token) => {
                        self.token.token = Some(token);
                        self.notify(NotificationEntry::success("Auth token issued"));
                    }
                    Err(e) => {
                        let error = crate::error::WorkflowError::from(e);
                        self.notify(failure_notice("Auth token", &error));
                        self.token.error = Some(error.to_string());
                    }
                }
            }
        }

        if let Some(job) = &mut self.server.job {
            if let Some(result) = job.poll() {
                self.server.job = None;
                match result {
                    Ok((status, latency)) => {
                        self.server.status = Some(status);
                        self.server.latency_ms = Some(latency);
                        self.server.error = None;
                    }
                    Err(e) => {
                        tracing::warn!("server_info failed: {}", e);
                        self.server.status = None;
                        self.server.latency_ms = None;
                        self.server.error = Some(e.to_string());
                    }
                }
            }
        }
    }

    // ---- Settings ----

    /// Rebuild the config from the pending settings. A different network,
    /// key or curve starts the workflow over.
    pub(crate) fn apply_settings(&mut self) {
        let pending = self.pending.clone();
        let Some(network) = NETWORKS.get(pending.network_index) else {
            return;
        };
        let mut config = Config::from_network(network);
        let custom = pending.custom_rpc.trim();
        if pending.use_custom_rpc && !custom.is_empty() {
            config.rpc_url = custom.to_string();
            config.label_override = Some(format!("{} (custom RPC)", network.label));
        }
        if let Err(e) = config.endpoint() {
            self.notify(NotificationEntry::error(e.to_string()));
            return;
        }
        config.account_index = pending.account_index;
        config.key_index = pending.key_index;
        config.fee_drops = pending.fee_drops;
        config.device_timeout = self.config.device_timeout;
        config.validation_timeout = self.config.validation_timeout;
        config.poll_interval = self.config.poll_interval;

        let restart = config.network_key != self.config.network_key
            || config.rpc_url != self.config.rpc_url
            || config.get_derivation_path() != self.config.get_derivation_path()
            || pending.ed25519 != self.use_ed25519;

        self.network_index = pending.network_index;
        self.use_ed25519 = pending.ed25519;
        self.workflow.set_fee_drops(config.fee_drops);
        self.config = config;

        if restart {
            self.restart_workflow();
            self.start_server_check();
            self.notify(NotificationEntry::new(format!(
                "Using {} at {}",
                self.config.network_label(),
                self.config.get_derivation_path()
            )));
        } else {
            self.notify(NotificationEntry::new("Settings applied"));
        }
    }

    /// Switch networks from the top bar selector
    fn select_network(&mut self, index: usize) {
        self.pending.network_index = index;
        self.pending.use_custom_rpc = false;
        self.apply_settings();
    }

    fn restart_workflow(&mut self) {
        self.workflow.reset();
        self.account_job = None;
        self.ledger_job = None;
        self.sign_job = None;
        self.submit_job = None;
        self.token = TokenState::default();
    }

    fn render_top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.add_space(10.0);
            ui.horizontal_wrapped(|ui| {
                ui.heading(RichText::new("Ledger Pay").size(24.0).strong().color(self.theme.text_primary));
                ui.label(
                    RichText::new(format!("v{}", env!("CARGO_PKG_VERSION")))
                        .size(12.0)
                        .color(self.theme.text_primary),
                );
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let mut selected: Option<usize> = None;
                    egui::ComboBox::from_id_source("network_selector")
                        .selected_text(self.config.network_label().to_string())
                        .width(200.0)
                        .show_ui(ui, |ui| {
                            ui.set_min_width(220.0);
                            let mut last_category: Option<NetworkCategory> = None;
                            for (idx, network) in NETWORKS.iter().enumerate() {
                                if last_category != Some(network.category) {
                                    if last_category.is_some() {
                                        ui.separator();
                                    }
                                    let header = match network.category {
                                        NetworkCategory::Mainnet => "── Mainnet ──",
                                        NetworkCategory::Testnet => "── Test Networks ──",
                                    };
                                    ui.label(RichText::new(header).color(self.theme.text_secondary).small());
                                    last_category = Some(network.category);
                                }
                                let is_selected = self.network_index == idx && self.config.label_override.is_none();
                                if ui.selectable_label(is_selected, network.label).clicked() {
                                    selected = Some(idx);
                                }
                            }
                        });
                    if let Some(idx) = selected {
                        self.select_network(idx);
                    }

                    ui.add_space(self.theme.spacing_md);

                    // Workflow stage badge
                    let stage = self.workflow.stage();
                    let (dot, color) = match (self.workflow.error(), self.workflow.is_busy()) {
                        (Some(_), _) => ("●", self.theme.error),
                        (None, true) => ("◐", self.theme.accent_blue),
                        (None, false) if self.workflow.account().is_some() => ("●", self.theme.success),
                        _ => ("●", self.theme.text_secondary),
                    };
                    let hover = match self.workflow.account() {
                        Some(account) => format!("{} ({})", account.address, account.derivation_path),
                        None => "No account fetched".to_string(),
                    };
                    egui::Frame::none()
                        .fill(self.theme.surface_hover)
                        .rounding(4.0)
                        .inner_margin(egui::Margin::symmetric(8.0, 4.0))
                        .show(ui, |ui| {
                            ui.horizontal(|ui| {
                                ui.label(RichText::new(dot).color(color).size(14.0)).on_hover_text(&hover);
                                ui.label(RichText::new(stage.label()).color(self.theme.text_secondary).size(12.0))
                                    .on_hover_text(&hover);
                            });
                        });
                });
            });
        });
    }

    fn render_notification_overlay(&mut self, ctx: &egui::Context) {
        let count = self.notifications.len();
        if count > self.last_notification_count {
            self.notification_toast_close_time = Some(Instant::now() + Duration::from_secs(5));
        }
        self.last_notification_count = count;
        let toast_visible = match self.notification_toast_close_time {
            Some(close) if Instant::now() < close => true,
            Some(_) => {
                self.notification_toast_close_time = None;
                false
            }
            None => false,
        };
        let latest = self.notifications.back().cloned();

        egui::Area::new(egui::Id::new("notification_overlay"))
            .anchor(egui::Align2::RIGHT_BOTTOM, [-10.0, -10.0])
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                egui::Frame::none()
                    .fill(self.theme.surface_hover)
                    .rounding(6.0)
                    .stroke(egui::Stroke::new(1.0, self.theme.primary))
                    .inner_margin(egui::Margin::symmetric(8.0, 6.0))
                    .show(ui, |ui| {
                        ui.horizontal(|ui| {
                            let icon_color = if count > 0 { self.theme.accent_green } else { self.theme.text_secondary };
                            if ui
                                .add(
                                    egui::Button::new(RichText::new("[!]").size(14.0).color(icon_color).strong())
                                        .fill(egui::Color32::TRANSPARENT)
                                        .stroke(egui::Stroke::NONE),
                                )
                                .on_hover_text("Click to view notification history")
                                .clicked()
                            {
                                self.show_notifications_popup = !self.show_notifications_popup;
                            }
                            match (&latest, toast_visible) {
                                (Some(entry), true) => {
                                    let text: String = entry.message.chars().take(48).collect();
                                    let color = self.level_color(entry.level);
                                    ui.label(RichText::new(format!("{} {}", entry.level.tag(), text)).size(12.0).color(color));
                                }
                                _ if count > 0 => {
                                    ui.label(RichText::new(count.to_string()).size(10.0).color(self.theme.accent_orange));
                                }
                                _ => {}
                            }
                        });
                    });
            });

        if self.show_notifications_popup {
            egui::Window::new("[#] Notification History")
                .collapsible(false)
                .resizable(true)
                .default_width(450.0)
                .default_height(350.0)
                .anchor(egui::Align2::RIGHT_BOTTOM, [-10.0, -50.0])
                .show(ctx, |ui| {
                    ui.horizontal(|ui| {
                        ui.label(RichText::new(format!("{} notifications", count)).color(self.theme.text_secondary));
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.add(self.theme.button_small("[X] Close")).clicked() {
                                self.show_notifications_popup = false;
                            }
                            if ui.add(self.theme.button_small("[C] Clear")).clicked() {
                                self.notifications.clear();
                            }
                        });
                    });
                    ui.label(RichText::new("-".repeat(50)).size(10.0).color(self.theme.primary));
                    egui::ScrollArea::vertical()
                        .auto_shrink([false, false])
                        .max_height(280.0)
                        .show(ui, |ui| {
                            self.render_notification_list(ui, usize::MAX);
                        });
                });
        }
    }

    /// Newest-first list of at most `limit` notifications
    pub(crate) fn render_notification_list(&self, ui: &mut egui::Ui, limit: usize) {
        if self.notifications.is_empty() {
            ui.label(RichText::new("No notifications yet.").color(self.theme.text_secondary));
            return;
        }
        for entry in self.notifications.iter().rev().take(limit) {
            ui.horizontal(|ui| {
                ui.label(
                    RichText::new(format!("[{}]", entry.time_ago()))
                        .size(11.0)
                        .color(self.theme.text_secondary),
                );
                ui.label(RichText::new(entry.level.tag()).size(12.0).color(self.level_color(entry.level)));
                ui.label(RichText::new(&entry.message).size(12.0).color(self.theme.text_primary));
            });
            ui.add_space(3.0);
        }
    }

    fn level_color(&self, level: super::notifications::NotificationLevel) -> egui::Color32 {
        use super::notifications::NotificationLevel;
        match level {
            NotificationLevel::Info => self.theme.text_primary,
            NotificationLevel::Success => self.theme.success,
            NotificationLevel::Error => self.theme.error,
        }
    }

    fn render_nav(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("nav")
            .resizable(false)
            .default_width(180.0)
            .frame(egui::Frame::none().fill(self.theme.surface).stroke(egui::Stroke::new(1.0, self.theme.primary)))
            .show(ctx, |ui| {
                ui.add_space(self.theme.spacing_md);
                ui.horizontal(|ui| {
                    ui.add_space(self.theme.spacing_xs);
                    ui.label(RichText::new("-".repeat(22)).size(10.0).color(self.theme.primary));
                });
                ui.add_space(self.theme.spacing_sm);

                let nav_items = [
                    (GuiSection::Dashboard, "[H] Dashboard"),
                    (GuiSection::Payment, "[$] Payment"),
                    (GuiSection::NftMint, "[N] Mint NFT"),
                    (GuiSection::AuthToken, "[K] Auth Token"),
                    (GuiSection::Settings, "[*] Settings"),
                ];

                for (section, label) in nav_items {
                    let selected = self.section == section;
                    ui.horizontal(|ui| {
                        if selected {
                            ui.add_space(2.0);
                            let (rect, _) = ui.allocate_exact_size(egui::vec2(3.0, 20.0), egui::Sense::hover());
                            ui.painter().rect_filled(rect, 0.0, self.theme.primary);
                            ui.add_space(4.0);
                        } else {
                            ui.add_space(9.0);
                        }
                        let text_color = if selected { self.theme.text_primary } else { self.theme.text_secondary };
                        let response = ui.add(
                            egui::Button::new(RichText::new(label).size(13.0).color(text_color))
                                .fill(egui::Color32::TRANSPARENT)
                                .stroke(egui::Stroke::NONE),
                        );
                        if response.clicked() {
                            if section == GuiSection::Dashboard && self.server.job.is_none() {
                                self.start_server_check();
                            }
                            self.section = section;
                        }
                    });
                    ui.add_space(self.theme.spacing_xs);
                }

                ui.add_space(self.theme.spacing_lg);
                ui.horizontal(|ui| {
                    ui.add_space(self.theme.spacing_xs);
                    ui.label(RichText::new("-".repeat(22)).size(10.0).color(self.theme.surface_active));
                });
            });
    }
}

impl App for GuiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.poll_jobs();

        self.render_top_bar(ctx);
        self.render_notification_overlay(ctx);
        self.render_nav(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(self.theme.spacing_md);
            egui::ScrollArea::vertical().show(ui, |ui| match self.section {
                GuiSection::Dashboard => self.view_dashboard(ui),
                GuiSection::Payment => self.view_payment(ui),
                GuiSection::NftMint => self.view_nft_mint(ui),
                GuiSection::AuthToken => self.view_auth_token(ui),
                GuiSection::Settings => self.view_settings(ui),
            });
        });

        ctx.request_repaint_after(Duration::from_millis(100));
    }
}

pub fn launch(config: Config) -> Result<()> {
    tracing::info!("Starting on {} ({})", config.network_label(), config.rpc_url);

    let app_creator = move |cc: &eframe::CreationContext<'_>| {
        Box::new(GuiApp::new(config.clone(), &cc.egui_ctx)) as Box<dyn App>
    };

    let viewport = egui::ViewportBuilder::default().with_inner_size([1100.0, 720.0]);
    let native_options = NativeOptions {
        viewport,
        persist_window: true,
        ..Default::default()
    };

    eframe::run_native("Ledger Pay - XRP Ledger hardware wallet", native_options, Box::new(app_creator))
        .map_err(|e| anyhow!("Failed to start GUI: {}", e))
}
