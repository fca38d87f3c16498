//! Infrastructure layer for the target application.
//!
//! Contains OS-facing adapters: the virtual keyboard, the TCP listener and
//! session loop, and configuration file storage.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `keybridge_core`, but MUST NOT be imported by the `application` layer
//! outside of tests.

pub mod input_emulation;
pub mod network;
pub mod storage;
