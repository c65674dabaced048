//! Batched instantiation.
//!
//! Systems whose ordered include paths are identical can be evaluated by a
//! single `nix-instantiate` process. Each batch is answered positionally, then
//! resolved to output paths with one `nix show-derivation` call, and only
//! written onto the inventory once every count and key has been checked.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::consts::{BATCH_EXPR, FINGERPRINT_SEPARATOR, SYSTEM_LIST_ARG};
use crate::inventory::Inventory;
use crate::nix::Assignment;
use crate::nix::reconcile::{assign, correlate, parse_derivation_lines, parse_show_derivation};

use super::types::{BuildContext, BuildError};

/// Systems sharing one build context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
  /// Include paths, duplicates removed, first occurrence kept.
  pub paths: Vec<String>,
  /// Member systems in the order they were requested.
  pub systems: Vec<String>,
}

/// Group the systems that still need work by build context.
///
/// Batches come back ordered by their fingerprint so runs are reproducible.
pub fn plan_batches(inventory: &Inventory, names: &[String]) -> Result<Vec<Batch>, BuildError> {
  let mut batches: BTreeMap<String, Batch> = BTreeMap::new();
  let mut seen = HashSet::new();

  for name in names {
    let system = inventory
      .systems
      .get(name)
      .ok_or_else(|| BuildError::UnknownSystem(name.clone()))?;
    if system.is_built() || !seen.insert(name.as_str()) {
      continue;
    }

    let paths = inventory.system_paths(name).unwrap_or_default();
    let fingerprint = paths.join(FINGERPRINT_SEPARATOR);
    batches
      .entry(fingerprint)
      .or_insert_with(|| Batch {
        paths: dedup(paths),
        systems: Vec::new(),
      })
      .systems
      .push(name.clone());
  }

  Ok(batches.into_values().collect())
}

/// Instantiate every named system, one evaluator process per batch.
///
/// Batches are committed as they complete. The first failure stops the run;
/// batches already committed stay committed and the rest are not attempted.
pub async fn instantiate_all(ctx: &BuildContext, inventory: &mut Inventory, names: &[String]) -> Result<(), BuildError> {
  let batches = plan_batches(inventory, names)?;
  if batches.is_empty() {
    debug!("nothing to instantiate");
    return Ok(());
  }

  info!(
    batches = batches.len(),
    systems = batches.iter().map(|b| b.systems.len()).sum::<usize>(),
    parallelism = ctx.parallelism,
    "instantiating systems"
  );

  if ctx.parallelism <= 1 {
    for batch in &batches {
      let assignments = instantiate_batch(ctx, batch).await?;
      commit(inventory, assignments)?;
    }
    return Ok(());
  }

  let semaphore = Arc::new(Semaphore::new(ctx.parallelism));
  let mut join_set = JoinSet::new();

  for batch in batches {
    let ctx = ctx.clone();
    let semaphore = semaphore.clone();

    join_set.spawn(async move {
      let _permit = semaphore.acquire_owned().await.map_err(|_| BuildError::Cancelled)?;
      instantiate_batch(&ctx, &batch).await
    });
  }

  // Dropping the set on error aborts the remaining batches.
  while let Some(joined) = join_set.join_next().await {
    let assignments = joined??;
    commit(inventory, assignments)?;
  }

  Ok(())
}

/// Evaluate one batch and reconcile its output. Touches no inventory state.
pub async fn instantiate_batch(ctx: &BuildContext, batch: &Batch) -> Result<Vec<Assignment>, BuildError> {
  info!(systems = ?batch.systems, "instantiating batch");

  let system_list = serde_json::to_string(&batch.systems)?;
  let mut args = Vec::with_capacity(2 * batch.paths.len() + 7);
  args.push("--include".to_string());
  args.push(ctx.deployment_include());
  for path in &batch.paths {
    args.push("--include".to_string());
    args.push(path.clone());
  }
  args.extend(["--argstr".to_string(), SYSTEM_LIST_ARG.to_string(), system_list]);
  args.extend(["--expr".to_string(), BATCH_EXPR.to_string()]);

  let stdout = ctx
    .evaluator
    .invoke(&ctx.tools.instantiate, &args)
    .await
    .map_err(|source| BuildError::Eval {
      context: format!("{} failed for {:?}", ctx.tools.instantiate, batch.systems),
      source,
    })?;

  let derivations = parse_derivation_lines(&stdout);
  let by_drv = correlate(&batch.systems, &derivations)?;
  debug!(derivations = ?derivations, "instantiated batch");

  let mut show_args = Vec::with_capacity(derivations.len() + 1);
  show_args.push("show-derivation".to_string());
  show_args.extend(derivations.iter().cloned());

  let details = ctx
    .evaluator
    .invoke(&ctx.tools.nix, &show_args)
    .await
    .map_err(|source| BuildError::Eval {
      context: format!("{} show-derivation failed for {:?}", ctx.tools.nix, batch.systems),
      source,
    })?;

  let infos = parse_show_derivation(&details)?;
  Ok(assign(&by_drv, infos)?)
}

/// Write reconciled results onto the inventory, all or nothing.
fn commit(inventory: &mut Inventory, assignments: Vec<Assignment>) -> Result<(), BuildError> {
  if let Some(missing) = assignments.iter().find(|a| !inventory.systems.contains_key(&a.system)) {
    return Err(BuildError::UnknownSystem(missing.system.clone()));
  }

  for assignment in assignments {
    let system = inventory
      .systems
      .get_mut(&assignment.system)
      .ok_or_else(|| BuildError::UnknownSystem(assignment.system.clone()))?;
    system.result = assignment.result;
    system.result_drv = assignment.result_drv;
  }
  Ok(())
}

fn dedup(paths: Vec<String>) -> Vec<String> {
  let mut seen = HashSet::new();
  paths.into_iter().filter(|p| seen.insert(p.clone())).collect()
}
