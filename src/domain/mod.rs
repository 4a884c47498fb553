//! Domain types and the ports the reconciliation flow talks through.

pub mod expense;
pub mod lifecycle;
pub mod payment;
pub mod ports;
pub mod scan;
pub mod tags;
