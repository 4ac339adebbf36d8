//! Application layer: store port, pagination arithmetic, and the cached todo repository.

pub mod error;
pub mod pagination;
pub mod repos;
pub mod todos;
