//! Correlation of evaluator output back to the systems that requested it.
//!
//! `nix-instantiate` answers a batch with one derivation path per line, in the
//! order the names were supplied, and `nix show-derivation` answers with an
//! object keyed by derivation path. Neither is trusted: every step checks the
//! counts before anything is assigned.

use std::collections::BTreeMap;

use tracing::debug;

use super::types::{Assignment, DerivationInfo, ReconcileError};

/// Longest slice of raw output kept in a parse error.
const MAX_PAYLOAD_CHARS: usize = 2_000;

/// Split instantiator output into derivation paths.
///
/// Leading and trailing newlines are dropped. Empty output yields an empty
/// list rather than a single empty path.
pub fn parse_derivation_lines(stdout: &[u8]) -> Vec<String> {
  let text = String::from_utf8_lossy(stdout);
  let text = text.trim_matches('\n');
  if text.is_empty() {
    return Vec::new();
  }
  text.split('\n').map(str::to_string).collect()
}

/// Build the derivation path → system name map by position.
pub fn correlate(systems: &[String], derivations: &[String]) -> Result<BTreeMap<String, String>, ReconcileError> {
  if derivations.len() != systems.len() {
    return Err(ReconcileError::BatchCardinality {
      expected: systems.len(),
      actual: derivations.len(),
      systems: systems.to_vec(),
      derivations: derivations.to_vec(),
    });
  }

  let mut by_drv = BTreeMap::new();
  for (drv, system) in derivations.iter().zip(systems) {
    if by_drv.insert(drv.clone(), system.clone()).is_some() {
      return Err(ReconcileError::DuplicateDerivation(drv.clone()));
    }
  }
  Ok(by_drv)
}

/// Parse `nix show-derivation` JSON.
pub fn parse_show_derivation(stdout: &[u8]) -> Result<BTreeMap<String, DerivationInfo>, ReconcileError> {
  serde_json::from_slice(stdout).map_err(|source| ReconcileError::MalformedOutput {
    source,
    payload: truncate_payload(&String::from_utf8_lossy(stdout)),
  })
}

/// Match parsed derivation details against the systems that asked for them.
///
/// Assignments come back in derivation-path order. Nothing is returned unless
/// every entry was accounted for.
pub fn assign(
  by_drv: &BTreeMap<String, String>,
  infos: BTreeMap<String, DerivationInfo>,
) -> Result<Vec<Assignment>, ReconcileError> {
  if infos.len() != by_drv.len() {
    return Err(ReconcileError::DerivationCardinality {
      expected: by_drv.len(),
      actual: infos.len(),
    });
  }

  let mut assignments = Vec::with_capacity(infos.len());
  for (drv, info) in infos {
    let system = by_drv
      .get(&drv)
      .ok_or_else(|| ReconcileError::UnexpectedDerivation(drv.clone()))?;
    debug!(system = %system, drv = %drv, out = %info.out_path(), "reconciled derivation");
    assignments.push(Assignment {
      system: system.clone(),
      result: info.outputs.out.path,
      result_drv: drv,
    });
  }
  Ok(assignments)
}

fn truncate_payload(payload: &str) -> String {
  let char_count = payload.chars().count();
  if char_count <= MAX_PAYLOAD_CHARS {
    return payload.to_string();
  }
  let mut preview: String = payload.chars().take(MAX_PAYLOAD_CHARS).collect();
  preview.push_str(&format!("... [truncated, total_chars={}]", char_count));
  preview
}
