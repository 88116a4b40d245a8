//! `netcore_shared`
//!
//! Protocol-level building blocks of the client network core.
//!
//! Design goals:
//! - Explicit byte layouts with bounds checks; no raw memory reinterpretation.
//! - Pure, socket-free code so every rule is unit testable.
//! - No `unsafe`.

pub mod assembler;
pub mod config;
pub mod encoder;
pub mod error;
pub mod math;
pub mod message;
pub mod reconcile;
pub mod wire;
