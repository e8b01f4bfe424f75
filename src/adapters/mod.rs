//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements          | Connects to                 |
//! |-------------|---------------------|-----------------------------|
//! | `log_sink`  | EventSink           | Serial log output           |
//! | `nvs`       | ConfigPort          | EEPROM / in-memory store    |
//! |             | StoragePort         |                             |
//! | `simulator` | InputPort           | First-order process model   |
//! |             | OutputPort          |                             |
//!
//! The SSR output driver lives in [`crate::drivers::ssr`] and implements
//! `OutputPort` directly.

pub mod log_sink;
pub mod nvs;
pub mod simulator;
