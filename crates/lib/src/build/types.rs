use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use crate::consts::DEPLOYMENT_INCLUDE;
use crate::nix::{EvalError, Evaluator, NixTools, ReconcileError};

/// Errors that can occur while instantiating or realising systems.
#[derive(Debug, Error)]
pub enum BuildError {
  /// A Nix tool failed to start or exited unsuccessfully.
  #[error("{context}")]
  Eval {
    context: String,
    #[source]
    source: EvalError,
  },

  /// Evaluator output did not match what was asked for.
  #[error(transparent)]
  Reconcile(#[from] ReconcileError),

  #[error("cannot find system {0:?} in inventory")]
  UnknownSystem(String),

  #[error("failed to read out link {}", .link.display())]
  ReadLink {
    link: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to encode system list")]
  Encode(#[from] serde_json::Error),

  /// Wraps the failure of one system in a multi-system build.
  #[error("failed to build {name:?}")]
  System {
    name: String,
    #[source]
    source: Box<BuildError>,
  },

  /// A concurrent instantiation task panicked or was aborted.
  #[error("instantiation task failed")]
  Task(#[from] tokio::task::JoinError),

  #[error("build cancelled")]
  Cancelled,
}

/// Steps of the pipeline that can be left out with `--no`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkipSteps {
  /// Instantiate derivations without realising them.
  pub realise: bool,
}

impl FromStr for SkipSteps {
  type Err = std::convert::Infallible;

  /// Parse a comma-separated step list. Unknown steps are logged and ignored.
  fn from_str(list: &str) -> Result<Self, Self::Err> {
    let mut steps = SkipSteps::default();
    for step in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
      match step {
        "realise" | "realize" | "realisation" | "skip-realisation" => steps.realise = true,
        other => warn!(step = other, "ignoring unknown step"),
      }
    }
    Ok(steps)
  }
}

/// How far each selected system is taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BuildMode {
  /// Build every system with `nix-build`, one process per system.
  #[default]
  Realise,
  /// Only instantiate derivations, batching systems with identical inputs.
  Instantiate,
}

impl From<SkipSteps> for BuildMode {
  fn from(steps: SkipSteps) -> Self {
    if steps.realise {
      BuildMode::Instantiate
    } else {
      BuildMode::Realise
    }
  }
}

/// Everything a build needs besides the inventory itself.
#[derive(Clone)]
pub struct BuildContext {
  /// Exposed to Nix as `<deployment>`.
  pub deployment_path: PathBuf,

  /// Where `nix-build` out links are written.
  pub link_dir: PathBuf,

  pub tools: NixTools,

  /// Maximum number of instantiation batches evaluated at once.
  pub parallelism: usize,

  pub evaluator: Arc<dyn Evaluator>,
}

impl BuildContext {
  pub fn new(deployment_path: impl Into<PathBuf>, link_dir: impl Into<PathBuf>, evaluator: Arc<dyn Evaluator>) -> Self {
    Self {
      deployment_path: deployment_path.into(),
      link_dir: link_dir.into(),
      tools: NixTools::default(),
      parallelism: 1,
      evaluator,
    }
  }

  pub fn with_tools(mut self, tools: NixTools) -> Self {
    self.tools = tools;
    self
  }

  pub fn with_parallelism(mut self, parallelism: usize) -> Self {
    self.parallelism = parallelism.max(1);
    self
  }

  pub(crate) fn deployment_include(&self) -> String {
    format!("{}={}", DEPLOYMENT_INCLUDE, self.deployment_path.display())
  }
}

impl std::fmt::Debug for BuildContext {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("BuildContext")
      .field("deployment_path", &self.deployment_path)
      .field("link_dir", &self.link_dir)
      .field("tools", &self.tools)
      .field("parallelism", &self.parallelism)
      .finish_non_exhaustive()
  }
}
