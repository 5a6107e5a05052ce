//! DiskWarden domain logic.
//!
//! Everything in this crate is free of I/O: the health state machine, the
//! alert decision engine, reading and settings types, alert message
//! composition, and the traits through which the scanner talks to its
//! collaborators (state store, reading source, notification and metrics
//! sinks). Concrete implementations live in the `db`, `events` and
//! `scanner` crates.

pub mod alert;
pub mod error;
pub mod health;
pub mod ports;
pub mod reading;
pub mod settings;
pub mod store;
pub mod types;
