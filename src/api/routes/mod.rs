//! API Routes
//!
//! Route handlers organized by functionality.

pub mod athletes;
pub mod expand;
pub mod health;
pub mod share;
pub mod tracking;
