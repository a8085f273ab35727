//! HTTP handlers

pub mod batch;
pub mod health;
pub mod insight;
pub mod metrics;
pub mod predict;
pub mod stream;
pub mod uploads;
