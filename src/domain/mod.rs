//! Core domain types and logic.

pub mod account;
pub mod audit;
pub mod bar;
pub mod config;
pub mod engine;
pub mod error;
pub mod generator;
pub mod indicator;
pub mod position;
pub mod registry;
pub mod session;
pub mod signal;
