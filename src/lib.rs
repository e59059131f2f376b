//! Scholarship Assist — deterministic core of a scholarship-application assistant.

pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod matcher;
pub mod pipeline;
pub mod profile;
pub mod review;
pub mod session;
pub mod store;
pub mod tools;
