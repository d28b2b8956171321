//! Widget components for the GUI
//!
//! - `TransactionView` - Shows the drafted transaction with sign/submit controls and the submission outcome

mod transaction_view;

pub use transaction_view::{outcome_explorer_url, TransactionCommand, TransactionView};
