//! External delivery transports used by the notifier.

pub mod email;
pub mod webhook;
