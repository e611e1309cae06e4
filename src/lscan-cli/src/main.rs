//! lscan - probe for the licence scanner bridge
//!
//! Exercises the bridge against the in-memory host, without a JVM.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lscan_bridge::local::LocalHost;
use lscan_bridge::{
    Bridge, BridgeConfig, DescriptorTable, FieldRole, HandleRegistry, MemberDescriptor, MethodRole,
    RasterHandle, Rect,
};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

mod replay;

use replay::{parse_region, Fixture, ReplayEngine};

#[derive(Parser)]
#[command(name = "lscan")]
#[command(about = "Probe the licence scanner host bridge")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the host contract and list every role
    Check {
        /// Remove a type (`owner`) or member (`owner.member`) from the host first
        #[arg(long = "without")]
        without: Vec<String>,
    },

    /// Replay recorded engine output through the bridge
    Replay {
        /// Fixture file (JSON)
        fixture: PathBuf,

        /// Analysis region as x,y,width,height
        #[arg(short, long, default_value = "0,0,0,0", value_parser = parse_region)]
        region: Rect,

        /// Alphabet passed to init
        #[arg(long, default_value = "")]
        alphabet: String,

        /// Model path passed to init
        #[arg(long, default_value = "")]
        model: String,
    },

    /// Print the effective configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let config = BridgeConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Check { without } => {
            cmd_check(&without)?;
        }
        Commands::Replay {
            fixture,
            region,
            alphabet,
            model,
        } => {
            cmd_replay(&config, &fixture, region, &alphabet, &model)?;
        }
        Commands::Config => {
            cmd_config(&config, cli.config.as_deref())?;
        }
    }

    Ok(())
}

fn cmd_check(without: &[String]) -> Result<()> {
    let mut host = LocalHost::android();
    for entry in without {
        host = match entry.rsplit_once('.') {
            Some((owner, member)) => host.without_member(owner, member),
            None => host.without_type(entry),
        };
    }

    let table = DescriptorTable::legacy();

    println!("Host contract:");
    for role in FieldRole::ALL {
        print_role(role.as_str(), table.field(role));
    }
    for role in MethodRole::ALL {
        print_role(role.as_str(), table.method(role));
    }
    println!();

    match HandleRegistry::resolve(&mut host, &table) {
        Ok(_) => {
            println!("{} all roles resolved", "OK".green().bold());
            Ok(())
        }
        Err(e) => {
            for failure in &e.failures {
                println!("{} {}", "MISSING".red().bold(), failure);
            }
            error!("{}", e);
            Err(anyhow::anyhow!("{} role(s) unresolved", e.failures.len()))
        }
    }
}

fn print_role(role: &str, d: &MemberDescriptor) {
    println!(
        "  {:<18} {}.{} {}",
        role.cyan(),
        d.owner,
        d.member,
        d.signature.dimmed()
    );
}

fn cmd_replay(
    config: &BridgeConfig,
    path: &Path,
    region: Rect,
    alphabet: &str,
    model: &str,
) -> Result<()> {
    let fixture = Fixture::from_file(path)?;
    let layout = config.host.rect_layout;
    info!("replaying {:?} over {:?} ({:?} layout)", path, region, layout);

    let mut host = LocalHost::android();
    let registry = lscan_bridge::resolve_legacy(&mut host).context("in-memory host is incomplete")?;

    let mut bridge = Bridge::new(ReplayEngine::new(fixture), layout);
    bridge.initialize(alphabet, model);

    let region = host.new_region(layout.to_host(region));
    let delivery = bridge.analyse_to_host(&mut host, &registry, RasterHandle::new(0), &region);

    let tree = delivery.root.as_ref().and_then(|root| host.snapshot(root));
    let report = serde_json::json!({
        "status": delivery.analysis.status,
        "text": bridge.last_result(),
        "tree": tree,
        "objects": host.stats(),
    });

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_config(config: &BridgeConfig, explicit: Option<&Path>) -> Result<()> {
    match BridgeConfig::locate(explicit) {
        Some(path) => info!("configuration file: {:?}", path),
        None => info!("no configuration file, using defaults"),
    }
    print!("{}", config.to_toml()?);
    Ok(())
}
