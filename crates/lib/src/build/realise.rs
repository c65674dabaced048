//! Full realisation of individual systems with `nix-build`.

use tracing::{debug, info, warn};

use crate::consts::{BUILD_EXPR, OUT_LINK_PREFIX};
use crate::inventory::Inventory;

use super::types::{BuildContext, BuildError};

/// What `nix-store --query --deriver` prints when the deriver is not known.
const UNKNOWN_DERIVER: &str = "unknown-deriver";

/// Realise every named system in order, stopping at the first failure.
pub async fn realise_all(ctx: &BuildContext, inventory: &mut Inventory, names: &[String]) -> Result<(), BuildError> {
  for name in names {
    realise_system(ctx, inventory, name)
      .await
      .map_err(|e| BuildError::System {
        name: name.clone(),
        source: Box::new(e),
      })?;
  }
  Ok(())
}

/// Build one system and record its output path and deriver.
///
/// Systems that already have a result are left alone. A failing deriver query
/// fails the system even though `result` has already been recorded.
pub async fn realise_system(ctx: &BuildContext, inventory: &mut Inventory, name: &str) -> Result<(), BuildError> {
  let system = inventory
    .systems
    .get(name)
    .ok_or_else(|| BuildError::UnknownSystem(name.to_string()))?;
  if system.is_built() {
    debug!(system = name, result = %system.result, "already built");
    return Ok(());
  }

  info!("building {:?}", name);
  let link = ctx.link_dir.join(format!("{}{}", OUT_LINK_PREFIX, name));
  let paths = inventory.system_paths(name).unwrap_or_default();

  let mut args = Vec::with_capacity(inventory.nix.build.flags.len() + 2 * paths.len() + 9);
  args.extend(inventory.nix.build.flags.iter().cloned());
  args.push("--out-link".to_string());
  args.push(link.display().to_string());
  args.push("--include".to_string());
  args.push(ctx.deployment_include());
  for path in paths {
    args.push("--include".to_string());
    args.push(path);
  }
  args.extend(["--argstr".to_string(), "name".to_string(), name.to_string()]);
  args.extend(["--expr".to_string(), BUILD_EXPR.to_string()]);

  ctx
    .evaluator
    .invoke(&ctx.tools.build, &args)
    .await
    .map_err(|source| BuildError::Eval {
      context: format!("{} failed for {:?}", ctx.tools.build, name),
      source,
    })?;

  let result = tokio::fs::read_link(&link)
    .await
    .map_err(|source| BuildError::ReadLink {
      link: link.clone(),
      source,
    })?
    .to_string_lossy()
    .into_owned();
  debug!(system = name, result = %result, "realised");
  record(inventory, name, |s| s.result = result.clone())?;

  let query = ["--query".to_string(), "--deriver".to_string(), result.clone()];
  let deriver = ctx
    .evaluator
    .invoke(&ctx.tools.store, &query)
    .await
    .map_err(|source| BuildError::Eval {
      context: format!("failed to query deriver of {}", result),
      source,
    })?;
  let deriver = String::from_utf8_lossy(&deriver).trim_end_matches('\n').to_string();

  if deriver == UNKNOWN_DERIVER {
    warn!(system = name, result = %result, "deriver unknown to the store");
    return Ok(());
  }
  record(inventory, name, |s| s.result_drv = deriver)
}

fn record<F>(inventory: &mut Inventory, name: &str, update: F) -> Result<(), BuildError>
where
  F: FnOnce(&mut crate::inventory::System),
{
  let system = inventory
    .systems
    .get_mut(name)
    .ok_or_else(|| BuildError::UnknownSystem(name.to_string()))?;
  update(system);
  Ok(())
}
