mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use hive_lib::nix::NixTools;

use crate::cmd::BuildOptions;
use crate::output::print_error;

/// hive - batched Nix builds for a fleet of systems
#[derive(Parser)]
#[command(name = "hive")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Build NixOS systems locally for deployment
  ///
  /// Prints the inventory, with results filled in, as JSON on stdout.
  Build(BuildArgs),
}

#[derive(Args)]
struct BuildArgs {
  /// Inventory file describing the fleet
  #[arg(short, long, env = "HIVE_INVENTORY", default_value = "inventory.json")]
  inventory: PathBuf,

  /// Deployment directory exposed to Nix as <deployment> (default: the inventory's directory)
  #[arg(short, long, env = "HIVE_DEPLOYMENT")]
  deployment: Option<PathBuf>,

  /// Comma-separated pipeline steps to skip (`realise` only instantiates)
  #[arg(long, default_value = "")]
  no: String,

  /// Number of instantiation batches to evaluate at once
  #[arg(short, long, default_value_t = 1)]
  jobs: usize,

  #[arg(long, env = "HIVE_NIX_INSTANTIATE", default_value = "nix-instantiate", hide = true)]
  nix_instantiate: String,

  #[arg(long, env = "HIVE_NIX_BUILD", default_value = "nix-build", hide = true)]
  nix_build: String,

  #[arg(long, env = "HIVE_NIX", default_value = "nix", hide = true)]
  nix: String,

  #[arg(long, env = "HIVE_NIX_STORE", default_value = "nix-store", hide = true)]
  nix_store: String,

  /// System names or wildcard patterns (default: every system)
  patterns: Vec<String>,
}

impl From<BuildArgs> for BuildOptions {
  fn from(args: BuildArgs) -> Self {
    Self {
      inventory: args.inventory,
      deployment: args.deployment,
      skip: args.no,
      jobs: args.jobs,
      tools: NixTools {
        instantiate: args.nix_instantiate,
        build: args.nix_build,
        nix: args.nix,
        store: args.nix_store,
      },
      patterns: args.patterns,
    }
  }
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let result = match cli.command {
    Commands::Build(args) => cmd::cmd_build(&args.into()),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      print_error(&format!("{:#}", e));
      ExitCode::FAILURE
    }
  }
}
