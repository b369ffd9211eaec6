//! Route handlers.

pub mod health;
pub mod qa;
pub mod vector;
