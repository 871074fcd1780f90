//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `taskpad_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    println!("taskpad_core version={}", taskpad_core::core_version());
}
