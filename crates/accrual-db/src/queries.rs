//! Database query functions organized by domain.

pub mod access;
pub mod engine;
pub mod ledger;
pub mod notifications;
pub mod participants;
pub mod settings;
pub mod source;
