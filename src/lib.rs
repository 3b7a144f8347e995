//! Waste-collection dispatch board: scheduling core plus the pieces the
//! desktop shell needs around it.

pub mod board;
pub mod config;
pub mod store;
pub mod ui;
