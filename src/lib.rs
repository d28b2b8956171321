pub mod auth_token;
pub mod codec;
pub mod config;
pub mod error;
pub mod gui;
pub mod network;
pub mod signer;
pub mod transport;
pub mod workflow;
pub mod xrp_app;
