//! Infrastructure adapters: Postgres and in-process todo stores, telemetry.

pub mod db;
pub mod error;
pub mod memory;
pub mod telemetry;
