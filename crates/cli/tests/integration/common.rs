//! Shared test helpers for CLI integration tests.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Fake `nix-instantiate`: one `/nix/store/h-<name>.drv` per name in the batch list.
const INSTANTIATE: &str = r#"
while [ $# -gt 0 ]; do
  if [ "$1" = hiveSystemListJson ]; then list="$2"; fi
  shift
done
echo "$list" | tr -d '[]"' | tr ',' '\n' | while read -r name; do
  printf '/nix/store/h-%s.drv\n' "$name"
done
"#;

/// Fake `nix show-derivation`: maps `<x>.drv` to output `<x>`.
const NIX: &str = r#"
shift
printf '{'
sep=''
for drv in "$@"; do
  printf '%s"%s":{"outputs":{"out":{"path":"%s"}}}' "$sep" "$drv" "${drv%.drv}"
  sep=','
done
printf '}\n'
"#;

/// Fake `nix-build`: links the out link to `/nix/store/0-<name>`.
const BUILD: &str = r#"
while [ $# -gt 0 ]; do
  case "$1" in
    --out-link) link="$2"; shift ;;
    --argstr) if [ "$2" = name ]; then name="$3"; fi; shift 2 ;;
  esac
  shift
done
ln -s "/nix/store/0-$name" "$link"
"#;

/// Fake `nix-store --query --deriver <path>`.
const STORE: &str = r#"
printf '%s.drv\n' "$3"
"#;

/// Inventory where `web` and `db` share a context and `edge` has its own.
pub const FLEET: &str = r#"{
  "systems": {
    "web": { "paths": ["p1"] },
    "db": { "paths": ["p1"] },
    "edge": { "paths": ["p2"] }
  }
}"#;

/// Isolated test environment with an inventory and fake Nix tools.
pub struct TestEnv {
  pub temp: TempDir,
  pub inventory: PathBuf,
}

impl TestEnv {
  pub fn new(inventory: &str) -> Self {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("inventory.json");
    std::fs::write(&path, inventory).unwrap();
    let env = Self { temp, inventory: path };
    env.tool("nix-instantiate", INSTANTIATE);
    env.tool("nix", NIX);
    env.tool("nix-build", BUILD);
    env.tool("nix-store", STORE);
    env
  }

  /// Write (or replace) a fake tool. Every call is appended to `calls.log`.
  pub fn tool(&self, name: &str, body: &str) {
    let log = self.calls_log();
    let script = format!("#!/bin/sh\necho \"{} $*\" >> '{}'\n{}", name, log.display(), body);
    let path = self.tool_path(name);
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
  }

  pub fn tool_path(&self, name: &str) -> PathBuf {
    self.temp.path().join(format!("fake-{}", name))
  }

  pub fn calls_log(&self) -> PathBuf {
    self.temp.path().join("calls.log")
  }

  /// Logged calls made to `name`.
  pub fn calls_to(&self, name: &str) -> Vec<String> {
    let log = std::fs::read_to_string(self.calls_log()).unwrap_or_default();
    let prefix = format!("{} ", name);
    log.lines().filter(|l| l.starts_with(&prefix)).map(str::to_string).collect()
  }

  pub fn dir(&self) -> &Path {
    self.temp.path()
  }

  /// `hive build` wired to this environment's inventory and tools.
  pub fn build_cmd(&self) -> Command {
    let mut cmd = cargo_bin_cmd!("hive");
    cmd
      .arg("build")
      .arg("--inventory")
      .arg(&self.inventory)
      .env("HIVE_NIX_INSTANTIATE", self.tool_path("nix-instantiate"))
      .env("HIVE_NIX", self.tool_path("nix"))
      .env("HIVE_NIX_BUILD", self.tool_path("nix-build"))
      .env("HIVE_NIX_STORE", self.tool_path("nix-store"))
      .env_remove("HIVE_DEPLOYMENT");
    cmd
  }
}
