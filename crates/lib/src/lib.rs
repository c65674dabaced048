//! hive-lib: batched Nix builds for a fleet of systems
//!
//! This crate provides the pieces behind `hive build`:
//! - `Inventory`: the fleet of systems and the configuration they share
//! - `Evaluator`: the seam to the Nix tools, with a process-backed implementation
//! - `build`: per-system realisation and batched instantiation
//! - `nix::reconcile`: strict correlation of Nix output back to systems

pub mod build;
pub mod consts;
pub mod inventory;
pub mod nix;
pub mod util;
