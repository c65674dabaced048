//! Implementation of the `hive build` command.
//!
//! Selects systems from the inventory, instantiates or realises them, and
//! prints the updated inventory as JSON on stdout. Nothing is printed on
//! stdout if any system fails.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{debug, info};

use hive_lib::build::{BuildContext, BuildError, BuildMode, SkipSteps, build_systems};
use hive_lib::inventory::Inventory;
use hive_lib::nix::{NixEvaluator, NixTools};

use crate::output::{format_duration, print_json, print_success};

/// Options for `hive build`, already resolved from flags and environment.
#[derive(Debug, Clone)]
pub struct BuildOptions {
  pub inventory: PathBuf,
  pub deployment: Option<PathBuf>,
  pub skip: String,
  pub jobs: usize,
  pub tools: NixTools,
  pub patterns: Vec<String>,
}

pub fn cmd_build(options: &BuildOptions) -> Result<()> {
  let mut inventory = Inventory::from_file(&options.inventory).context("Failed to load inventory")?;
  let names = inventory
    .match_systems(&options.patterns)
    .context("Failed to select systems")?;

  let deployment = match &options.deployment {
    Some(path) => path.clone(),
    None => default_deployment(&options.inventory)?,
  };
  let mode = BuildMode::from(options.skip.parse::<SkipSteps>().unwrap_or_default());

  let links = tempfile::Builder::new()
    .prefix("hive-")
    .tempdir()
    .context("Failed to create out link directory")?;
  debug!(links = %links.path().display(), deployment = %deployment.display(), "prepared build context");

  let ctx = BuildContext::new(deployment, links.path(), Arc::new(NixEvaluator::new()))
    .with_tools(options.tools.clone())
    .with_parallelism(options.jobs);

  let started = Instant::now();
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  rt.block_on(async {
    tokio::select! {
      result = build_systems(&ctx, &mut inventory, &names, mode) => result,
      _ = tokio::signal::ctrl_c() => Err(BuildError::Cancelled),
    }
  })
  .context("Build failed")?;

  info!(systems = names.len(), "build finished");
  let verb = match mode {
    BuildMode::Instantiate => "Instantiated",
    BuildMode::Realise => "Built",
  };
  print_success(&format!(
    "{} {} system(s) in {}",
    verb,
    names.len(),
    format_duration(started.elapsed())
  ));

  print_json(&inventory)
}

/// The directory holding the inventory file, as an absolute path.
fn default_deployment(inventory: &Path) -> Result<PathBuf> {
  let dir = match inventory.parent() {
    Some(parent) if !parent.as_os_str().is_empty() => parent,
    _ => Path::new("."),
  };
  std::path::absolute(dir).with_context(|| format!("Failed to resolve deployment path from {}", dir.display()))
}
