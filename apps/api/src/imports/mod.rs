//! PDF import flow: upload → preview (pending import) → confirm selection.

pub mod handlers;
pub mod pending;
pub mod service;
