//! HTTP handlers

pub mod drift;
pub mod health;
pub mod importance;
pub mod predict;
pub mod summary;
