//! CSV adapters for replaying recorded host events and printing records.

pub mod event_reader;
pub mod expense_writer;
