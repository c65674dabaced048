//! Process boundary to the Nix tools.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use super::types::EvalError;

/// Runs one of the Nix tools and hands back its stdout.
///
/// Diagnostics go to the host's stderr, never into the returned bytes.
/// Implementations must stop the child process when the returned future is
/// dropped so an abandoned build does not leave evaluators running.
#[async_trait]
pub trait Evaluator: Send + Sync {
  async fn invoke(&self, bin: &str, args: &[String]) -> Result<Vec<u8>, EvalError>;
}

/// The four tool entry points hive drives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NixTools {
  pub instantiate: String,
  pub build: String,
  pub nix: String,
  pub store: String,
}

impl Default for NixTools {
  fn default() -> Self {
    Self {
      instantiate: "nix-instantiate".to_string(),
      build: "nix-build".to_string(),
      nix: "nix".to_string(),
      store: "nix-store".to_string(),
    }
  }
}

/// Evaluator backed by real child processes.
#[derive(Debug, Clone, Default)]
pub struct NixEvaluator;

impl NixEvaluator {
  pub fn new() -> Self {
    Self
  }
}

#[async_trait]
impl Evaluator for NixEvaluator {
  async fn invoke(&self, bin: &str, args: &[String]) -> Result<Vec<u8>, EvalError> {
    info!("running {} {}", bin, args.join(" "));

    // `output()` would pipe stderr; spawn keeps the inherited handle.
    let child = Command::new(bin)
      .args(args)
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::inherit())
      .kill_on_drop(true)
      .spawn()
      .map_err(|source| EvalError::Spawn {
        bin: bin.to_string(),
        source,
      })?;
    let output = child.wait_with_output().await?;

    if !output.status.success() {
      return Err(EvalError::Failed {
        bin: bin.to_string(),
        code: output.status.code(),
      });
    }

    debug!(bin, bytes = output.stdout.len(), "command finished");
    Ok(output.stdout)
  }
}
