//! Infrastructure layer for the controller.
//!
//! Contains OS-facing adapters: the global input hook, the TCP connection to
//! the target, and configuration file storage.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `keybridge_core`.  The application layer only reaches into it for the
//! hook traits and event types in `input_capture`.

pub mod input_capture;
pub mod network;
pub mod storage;
