//! First-launch seeding orchestration.
//!
//! # Responsibility
//! - Run the one-time remote seed import exactly once per store lifetime.

pub mod seed;
