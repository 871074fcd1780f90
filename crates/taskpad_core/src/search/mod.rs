//! Debounced search entry points.
//!
//! # Responsibility
//! - Coalesce rapid query changes into a single store search.

pub mod debounce;
