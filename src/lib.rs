// src/lib.rs

pub mod analysis;
pub mod config;
pub mod error;
pub mod loader;
pub mod models;
pub mod report;
pub mod stats;
