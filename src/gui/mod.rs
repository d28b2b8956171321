//! GUI module for Ledger Pay
//!
//! This module provides the graphical user interface built with egui/eframe.
//!
//! ## Module Structure
//!
//! - `app` - Main GuiApp struct, background jobs and the panel layout
//! - `async_job` - Polling of background jobs and the workflow tickets they carry
//! - `theme` - Centralized theme and styling system (AppTheme)
//! - `notifications` - Notification history
//! - `views` - View rendering functions (dashboard, payment, nft, auth, settings)
//! - `widgets` - Reusable UI widgets (TransactionView)
//!
//! ## Usage
//!
//! ```no_run
//! use ledgerpay::config::Config;
//! use ledgerpay::gui;
//!
//! let config = Config::default();
//! gui::launch(config).expect("Failed to launch GUI");
//! ```

mod app;
pub mod async_job;
pub mod notifications;
pub mod theme;
pub mod views;
pub mod widgets;

pub use app::{launch, GuiApp, GuiSection};

pub use async_job::{AsyncJob, WorkflowJob};
pub use notifications::NotificationEntry;
pub use theme::{configure_style, AppTheme};
pub use widgets::TransactionView;
