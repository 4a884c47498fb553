//! Application layer orchestrating the scan-to-pay flow.
//!
//! `ReconciliationController` owns one pending payment at a time and turns
//! foreground edges and user decisions into committed or discarded cycles.
//! `ScanSession` wires it to the scan gate, the intent builder and the
//! lifecycle watcher for the lifetime of one screen.

pub mod controller;
pub mod session;
