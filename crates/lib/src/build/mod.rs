//! Instantiation and realisation of fleet systems.
//!
//! Two ways to take a system forward:
//!
//! - [`realise`] builds each system with `nix-build`, one process per system,
//!   and records the output path and its deriver.
//! - [`instantiate`] only evaluates derivations, batching systems whose
//!   include paths are identical into a single `nix-instantiate` call.
//!
//! Both skip systems that already have a result and both stop at the first
//! failure.

pub mod instantiate;
pub mod realise;
mod types;

use tracing::info;

use crate::inventory::Inventory;

pub use instantiate::{Batch, instantiate_all, plan_batches};
pub use realise::{realise_all, realise_system};
pub use types::*;

/// Take every named system as far as `mode` asks.
pub async fn build_systems(
  ctx: &BuildContext,
  inventory: &mut Inventory,
  names: &[String],
  mode: BuildMode,
) -> Result<(), BuildError> {
  info!(systems = names.len(), mode = ?mode, "starting build");
  match mode {
    BuildMode::Instantiate => instantiate_all(ctx, inventory, names).await,
    BuildMode::Realise => realise_all(ctx, inventory, names).await,
  }
}
