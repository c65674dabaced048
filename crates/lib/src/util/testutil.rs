//! Test utilities for hive-lib.
//!
//! Cross-platform shell helpers for tests that spawn real processes, and a
//! scripted [`Evaluator`] for tests that must not touch Nix.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::nix::{EvalError, Evaluator};

/// Returns the shell command and args to execute a shell script.
#[cfg(unix)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("/bin/sh", vec!["-c".to_string(), script.to_string()])
}

#[cfg(windows)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("cmd.exe", vec!["/C".to_string(), script.to_string()])
}

/// Returns the command and args to echo a message.
#[cfg(unix)]
pub fn echo_msg(msg: &str) -> (&'static str, Vec<String>) {
  ("/bin/echo", vec![msg.to_string()])
}

#[cfg(windows)]
pub fn echo_msg(msg: &str) -> (&'static str, Vec<String>) {
  ("cmd.exe", vec!["/C".to_string(), format!("echo {}", msg)])
}

type Handler = Box<dyn Fn(&[String]) -> Result<Vec<u8>, EvalError> + Send + Sync>;

/// One recorded evaluator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
  pub bin: String,
  pub args: Vec<String>,
}

impl Call {
  /// Value following `flag` in the argument list.
  pub fn arg_after(&self, flag: &str) -> Option<&str> {
    self
      .args
      .iter()
      .position(|a| a == flag)
      .and_then(|i| self.args.get(i + 1))
      .map(String::as_str)
  }

  /// Every value passed with `--include`.
  pub fn includes(&self) -> Vec<&str> {
    self
      .args
      .windows(2)
      .filter(|w| w[0] == "--include")
      .map(|w| w[1].as_str())
      .collect()
  }
}

/// Evaluator that answers from canned handlers and records every call.
///
/// Handlers are queued per binary and consumed in order. A call with no
/// handler left fails with exit code 127.
#[derive(Default)]
pub struct ScriptedEvaluator {
  handlers: Mutex<HashMap<String, VecDeque<Handler>>>,
  calls: Mutex<Vec<Call>>,
}

impl ScriptedEvaluator {
  pub fn new() -> Self {
    Self::default()
  }

  /// Queue a fixed stdout for the next call to `bin`.
  pub fn respond(self, bin: &str, stdout: impl Into<Vec<u8>>) -> Self {
    let stdout = stdout.into();
    self.respond_with(bin, move |_| Ok(stdout.clone()))
  }

  /// Queue a failure for the next call to `bin`.
  pub fn fail(self, bin: &str, code: i32) -> Self {
    let name = bin.to_string();
    self.respond_with(bin, move |_| {
      Err(EvalError::Failed {
        bin: name.clone(),
        code: Some(code),
      })
    })
  }

  /// Queue a handler computing the next response to `bin` from its arguments.
  pub fn respond_with<F>(self, bin: &str, handler: F) -> Self
  where
    F: Fn(&[String]) -> Result<Vec<u8>, EvalError> + Send + Sync + 'static,
  {
    self
      .handlers
      .lock()
      .unwrap()
      .entry(bin.to_string())
      .or_default()
      .push_back(Box::new(handler));
    self
  }

  pub fn calls(&self) -> Vec<Call> {
    self.calls.lock().unwrap().clone()
  }

  pub fn calls_to(&self, bin: &str) -> Vec<Call> {
    self.calls().into_iter().filter(|c| c.bin == bin).collect()
  }
}

#[async_trait]
impl Evaluator for ScriptedEvaluator {
  async fn invoke(&self, bin: &str, args: &[String]) -> Result<Vec<u8>, EvalError> {
    self.calls.lock().unwrap().push(Call {
      bin: bin.to_string(),
      args: args.to_vec(),
    });
    let handler = self.handlers.lock().unwrap().get_mut(bin).and_then(VecDeque::pop_front);
    match handler {
      Some(handler) => handler(args),
      None => Err(EvalError::Failed {
        bin: bin.to_string(),
        code: Some(127),
      }),
    }
  }
}

/// A fake `nix-instantiate` answer: one derivation per name in the batch
/// argument, named `/nix/store/<prefix>-<name>.drv`.
pub fn instantiate_names(args: &[String], prefix: &str) -> Result<Vec<u8>, EvalError> {
  let list = args
    .iter()
    .position(|a| a == crate::consts::SYSTEM_LIST_ARG)
    .and_then(|i| args.get(i + 1))
    .expect("batch argument present");
  let names: Vec<String> = serde_json::from_str(list).expect("batch argument is a JSON list");
  let mut out = String::new();
  for name in names {
    out.push_str(&format!("/nix/store/{}-{}.drv\n", prefix, name));
  }
  Ok(out.into_bytes())
}

/// A fake `nix show-derivation` answer for the derivations named in `args`,
/// mapping `<x>.drv` to output `<x>-out`.
pub fn show_requested(args: &[String]) -> Result<Vec<u8>, EvalError> {
  let map: serde_json::Map<String, serde_json::Value> = args
    .iter()
    .filter(|a| a.ends_with(".drv"))
    .map(|drv| {
      let out = format!("{}-out", drv.trim_end_matches(".drv"));
      (drv.clone(), serde_json::json!({ "outputs": { "out": { "path": out } } }))
    })
    .collect();
  Ok(serde_json::to_vec(&serde_json::Value::Object(map)).expect("serializable"))
}
