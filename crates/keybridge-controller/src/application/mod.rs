//! Application layer use cases for the controller.
//!
//! # What is the "application" layer? (for beginners)
//!
//! The *application* layer sits between the shared protocol types in
//! `keybridge_core` and the infrastructure (OS hooks, sockets, files).
//! Code in this layer depends only on traits, so every decision it makes can
//! be unit-tested without a real keyboard hook or a real network.
//!
//! # Sub-modules
//!
//! - **`control`** – The forwarding/suppression state and the toggle that
//!   flips it by restarting the input hook.
//!
//! - **`capture_service`** – Receives every captured event, handles the
//!   hotkey, classifies ordinary keys, and hands forwarded keys to the
//!   transmitter.

pub mod capture_service;
pub mod control;
