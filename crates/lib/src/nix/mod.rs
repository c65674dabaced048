//! Nix tool adapter and output reconciliation.
//!
//! # Submodules
//!
//! - [`eval`] - the [`Evaluator`] seam and its process-backed implementation
//! - [`reconcile`] - parsing and cross-checking of evaluator output

pub mod eval;
pub mod reconcile;
mod types;

pub use eval::{Evaluator, NixEvaluator, NixTools};
pub use types::*;
