//! Application layer use cases for the target.
//!
//! - **`inject_keys`** – Translates each received key event through the key
//!   identifier table and writes it to the virtual keyboard.  Depends only
//!   on the [`VirtualKeyboard`](inject_keys::VirtualKeyboard) trait, so it is
//!   fully unit-testable without uinput.

pub mod inject_keys;
