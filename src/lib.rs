//! Per-owner todo repository with a read-through, namespace-invalidated list cache.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
