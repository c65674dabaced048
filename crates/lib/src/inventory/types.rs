use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading an inventory or selecting systems from it.
#[derive(Debug, Error)]
pub enum InventoryError {
  #[error("failed to read inventory {}", .path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse inventory{}", display_path(.path))]
  Parse {
    path: Option<PathBuf>,
    #[source]
    source: serde_json::Error,
  },

  /// A pattern given on the command line did not select any system.
  #[error("no system matches {0:?}")]
  NoMatch(String),
}

fn display_path(path: &Option<PathBuf>) -> String {
  path.as_ref().map(|p| format!(" {}", p.display())).unwrap_or_default()
}

/// Flags passed to every `nix-build` invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NixBuildConfig {
  #[serde(default)]
  pub flags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NixConfig {
  #[serde(default)]
  pub build: NixBuildConfig,
}

/// One buildable target in the fleet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct System {
  /// Include directives the evaluator must be given for this system.
  #[serde(default)]
  pub paths: Vec<String>,

  /// Realised output path. Empty until built.
  #[serde(default)]
  pub result: String,

  /// Derivation that produced `result`. Empty until instantiated.
  #[serde(default)]
  pub result_drv: String,

  /// Fields owned by other tools, carried through untouched.
  #[serde(flatten)]
  pub extra: BTreeMap<String, serde_json::Value>,
}

impl System {
  pub fn new(paths: Vec<String>) -> Self {
    Self {
      paths,
      ..Self::default()
    }
  }

  /// A system with a result is satisfied and skipped by later passes.
  pub fn is_built(&self) -> bool {
    !self.result.is_empty()
  }
}

/// The fleet: every system plus the configuration they share.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
  #[serde(default)]
  pub systems: BTreeMap<String, System>,

  /// Include directives shared by every system, placed before the system's own.
  #[serde(default)]
  pub paths: Vec<String>,

  #[serde(default)]
  pub nix: NixConfig,
}
