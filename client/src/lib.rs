//! Client-side engine for the SecureDeal escrow marketplace.
//!
//! Provides everything the user-facing surface needs:
//! - Session lifecycle (OTP, signup, login, logout, bootstrap)
//! - The deal store with cache-then-revalidate synchronization
//! - The deal status state machine and lifecycle operations
//! - The four-step creation wizard with a resumable draft
//! - Document/image uploads to the media host
//! - USDC payment orchestration behind a wallet-adapter seam
//! - Profile, contact, and wallet-address management

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod deals;
pub mod media;
pub mod models;
pub mod profile;
pub mod solana;
pub mod state;
pub mod wizard;

pub use api::{ApiClient, ApiError};
pub use cache::CacheStore;
pub use config::AppConfig;
pub use state::{AppState, DealStore};
