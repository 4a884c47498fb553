//! Scan-to-pay reconciliation for a spending tracker.
//!
//! A payment QR code is scanned, the user fills in amount, tag and note, and
//! control is handed to an external payment app through a deep link. When the
//! host application comes back to the foreground the user is asked whether the
//! payment went through; only an explicit "yes" records the expense.

pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
pub mod settings;
