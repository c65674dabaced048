//! Fleet inventory.
//!
//! The inventory is the JSON document describing every system the fleet can
//! build. It is loaded once per run, updated in place as systems are
//! instantiated or realised, and written back out as JSON.

mod pattern;
mod types;

use std::path::Path;

use tracing::debug;

pub use pattern::wildcard_match;
pub use types::*;

impl Inventory {
  /// Load an inventory from a JSON file.
  pub fn from_file(path: &Path) -> Result<Self, InventoryError> {
    let content = std::fs::read_to_string(path).map_err(|source| InventoryError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let inventory: Inventory = serde_json::from_str(&content).map_err(|source| InventoryError::Parse {
      path: Some(path.to_path_buf()),
      source,
    })?;
    debug!(path = %path.display(), systems = inventory.systems.len(), "loaded inventory");
    Ok(inventory)
  }

  pub fn from_json(content: &str) -> Result<Self, InventoryError> {
    serde_json::from_str(content).map_err(|source| InventoryError::Parse { path: None, source })
  }

  /// Ordered include directives for a system: shared paths, then the system's own.
  ///
  /// Returns `None` if the system is not in the inventory.
  pub fn system_paths(&self, name: &str) -> Option<Vec<String>> {
    let system = self.systems.get(name)?;
    Some(self.paths.iter().chain(system.paths.iter()).cloned().collect())
  }

  /// Resolve name patterns to system names.
  ///
  /// Patterns are exact names or shell-style wildcards (`*`, `?`). An empty
  /// pattern list selects every system. The result is sorted and free of
  /// duplicates.
  pub fn match_systems<S: AsRef<str>>(&self, patterns: &[S]) -> Result<Vec<String>, InventoryError> {
    if patterns.is_empty() {
      return Ok(self.systems.keys().cloned().collect());
    }

    let mut selected = std::collections::BTreeSet::new();
    for pattern in patterns {
      let pattern = pattern.as_ref();
      let before = selected.len();
      let mut matched = false;
      for name in self.systems.keys() {
        if wildcard_match(pattern, name) {
          matched = true;
          selected.insert(name.clone());
        }
      }
      if !matched {
        return Err(InventoryError::NoMatch(pattern.to_string()));
      }
      debug!(pattern, added = selected.len() - before, "matched systems");
    }

    Ok(selected.into_iter().collect())
  }
}
