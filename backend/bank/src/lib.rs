//! # MindBattle Bank
//!
//! Everything the contest platform knows about money, contests and ranking.
//!
//! ## Pieces
//! - [`ledger`]: wallet state transitions, one transaction per action
//! - [`lifecycle`]: contest status machine and the clock driven sweep
//! - [`ranking`]: points per result, tiers, prize lookups
//! - [`permissions`]: closed role and permission sets for the admin panel
//! - [`store`] + [`state`]: JSON documents under fixed keys, loaded into one
//!   explicit [`state::AppState`]
//! - [`service`]: the operations the UI and admin tooling call
//!
//! ## Invariants
//! - `wallet_balance` equals the sum of every transaction that is neither
//!   pending nor declined
//! - A withdrawal debits the balance once, on approval
//! - Contest status only moves forward; `Cancelled` and `Rejected` are terminal
//! - Points never drop below zero
//!
//! Nothing here is async and nothing spawns threads. Callers serialize access
//! (the server keeps the service behind a mutex).
pub mod ledger;
pub mod lifecycle;
pub mod models;
pub mod permissions;
pub mod ranking;
pub mod service;
pub mod state;
pub mod store;
pub mod utils;

pub use service::{Service, ServiceError, ServiceResult};
