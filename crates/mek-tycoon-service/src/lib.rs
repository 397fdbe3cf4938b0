//! Mek Tycoon HTTP API Service.
//!
//! This crate provides the HTTP API for the Mek Tycoon economy, including:
//!
//! - Wallet sign-in (CIP-30 signed nonces, session tokens)
//! - Accounts, gold accrual and company names
//! - Mek slotting, tenure and level-ups
//! - Leaderboard reads
//! - Commemorative NFT campaign reservations and the payment webhook
//! - Admin configuration and cleanup
//!
//! # Authentication
//!
//! The service supports three authentication methods:
//!
//! 1. **Session tokens** - For players, issued after a wallet signs a nonce
//! 2. **Service API keys** - For the payment provider webhook
//! 3. **Admin API keys** - For `/v1/admin` endpoints

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers call the synchronous store

pub mod auth;
pub mod blockfrost;
pub mod config;
pub mod crypto;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod routes;
pub mod state;

pub use blockfrost::{BlockfrostClient, BlockfrostError};
pub use config::ServiceConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
