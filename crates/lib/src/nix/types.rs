use serde::Deserialize;
use thiserror::Error;

/// Errors raised by an evaluator invocation.
#[derive(Debug, Error)]
pub enum EvalError {
  /// The binary could not be started.
  #[error("failed to run {bin}")]
  Spawn {
    bin: String,
    #[source]
    source: std::io::Error,
  },

  /// The binary ran and exited unsuccessfully.
  #[error("{bin} exited with status {}", .code.map(|c| c.to_string()).unwrap_or_else(|| "signal".to_string()))]
  Failed { bin: String, code: Option<i32> },

  /// Waiting on a running child failed.
  #[error(transparent)]
  Io(#[from] std::io::Error),
}

/// Errors raised while correlating evaluator output back to systems.
///
/// Every variant means the evaluator did not honour its output contract, or
/// the caller handed over inconsistent inputs.
#[derive(Debug, Error)]
pub enum ReconcileError {
  #[error("attempting to process a batch of {expected} systems ({systems:?}), but {actual} results were returned: {derivations:?}")]
  BatchCardinality {
    expected: usize,
    actual: usize,
    systems: Vec<String>,
    derivations: Vec<String>,
  },

  #[error("asked Nix to show {expected} derivations, but received {actual} results")]
  DerivationCardinality { expected: usize, actual: usize },

  #[error("received information on unexpected derivation {0:?}")]
  UnexpectedDerivation(String),

  #[error("derivation {0:?} was returned for more than one system")]
  DuplicateDerivation(String),

  #[error("failed to parse derivation details from output {payload:?}")]
  MalformedOutput {
    #[source]
    source: serde_json::Error,
    payload: String,
  },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DerivationOutput {
  pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DerivationOutputs {
  pub out: DerivationOutput,
}

/// The part of `nix show-derivation` output hive relies on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DerivationInfo {
  pub outputs: DerivationOutputs,
}

impl DerivationInfo {
  pub fn out_path(&self) -> &str {
    &self.outputs.out.path
  }
}

/// A result ready to be written onto one system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
  pub system: String,
  pub result: String,
  pub result_drv: String,
}
