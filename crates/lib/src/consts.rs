//! Names and Nix expressions shared across the crate.

/// Include key under which the deployment directory is exposed to Nix.
pub const DEPLOYMENT_INCLUDE: &str = "deployment";

/// Top-level expression realised for a single system.
///
/// Evaluated with `--argstr name <system>`.
pub const BUILD_EXPR: &str = "(import <hive/build.nix>)";

/// Argument carrying the JSON-encoded list of system names for a batch.
pub const SYSTEM_LIST_ARG: &str = "hiveSystemListJson";

/// Expression that instantiates one derivation per name in `hiveSystemListJson`.
///
/// Nix prints one derivation path per line, in list order.
pub const BATCH_EXPR: &str = "{hiveSystemListJson}: let hiveExpr = import <hive/build.nix>; targets = builtins.fromJSON hiveSystemListJson; in map (name: hiveExpr { inherit name; }) targets";

/// Prefix of the out link written by `nix-build` for a system.
pub const OUT_LINK_PREFIX: &str = "system-";

/// Separator used to join context paths into a grouping key.
pub const FINGERPRINT_SEPARATOR: &str = "\0";
