//! # API Route Modules
//!
//! - `appointments`: booking lifecycle and fee negotiation.
//! - `messages`: per-appointment message log and chat entries.
//! - `notifications`: the caller's notification inbox.

pub mod appointments;
pub mod messages;
pub mod notifications;
