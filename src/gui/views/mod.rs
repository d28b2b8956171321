//! View modules for the GUI
//!
//! Each submodule adds `view_*` methods to `GuiApp` that `App::update` calls
//! for the selected section.
//!
//! - `dashboard` - Network status, wallet summary, recent activity and about
//! - `wallet` - Account, error and transaction panels shared by the flows below
//! - `payment` - XRP payment form
//! - `nft` - NFTokenMint form
//! - `auth` - Device-signed auth tokens
//! - `settings` - Network, key and fee configuration

pub mod auth;
pub mod dashboard;
pub mod nft;
pub mod payment;
pub mod settings;
pub mod wallet;
