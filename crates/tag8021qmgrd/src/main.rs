//! tag8021qmgrd - 802.1Q port identification manager
//!
//! Entry point for the tag8021qmgrd command.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tag8021q::{Direction, TagVid, VlanTag, VID_MASK};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tag8021qmgrd::{Tag8021qConfig, TaggerMgr, DEFAULT_CONFIG_PATH};

/// 802.1Q port identification manager
#[derive(Parser, Debug)]
#[command(name = "tag8021qmgrd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,

    /// Print bridge commands instead of running them
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Install RX/TX memberships
    Enable(Target),
    /// Remove RX/TX memberships
    Disable(Target),
    /// Show the VIDs and tagging state of every configured port
    ///
    /// The state is read back from the bridge VLAN table. Skipping of
    /// redundant enable/disable requests only covers a single invocation.
    Status,
    /// Print the VID of a (direction, switch, port) triple
    Encode {
        #[arg(short, long, value_enum)]
        direction: DirectionArg,
        #[arg(short, long)]
        switch: usize,
        #[arg(short, long)]
        port: usize,
    },
    /// Decode a VID (decimal or 0x-prefixed hex)
    Decode { vid: String },
}

/// Which ports a transition applies to; all switches if omitted
#[derive(ClapArgs, Debug)]
struct Target {
    /// Switch index
    #[arg(short, long)]
    switch: Option<usize>,

    /// Interface name (requires --switch)
    #[arg(short, long, requires = "switch")]
    port: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum DirectionArg {
    Rx,
    Tx,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Rx => Direction::Rx,
            DirectionArg::Tx => Direction::Tx,
        }
    }
}

/// Initializes tracing/logging subsystem
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log level '{}'", level))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow!("failed to set tracing subscriber: {}", e))
}

fn parse_vid(s: &str) -> Result<u16> {
    let value = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse(),
    }
    .with_context(|| format!("invalid VID '{}'", s))?;

    if value > VID_MASK {
        bail!("VID {} does not fit in 12 bits", value);
    }
    Ok(value)
}

fn transition(args: &Args, target: &Target, enabled: bool) -> Result<()> {
    let mut config = Tag8021qConfig::load_or_default(&args.config)?;
    config.dry_run |= args.dry_run;
    let mut mgr = TaggerMgr::from_config(&config)?;

    let applied = match (target.switch, target.port.as_deref()) {
        (Some(switch), Some(port)) => usize::from(mgr.set_port_tagging(switch, port, enabled)?),
        (Some(switch), None) => mgr.set_switch_tagging(switch, enabled)?,
        (None, _) => mgr.set_all(enabled)?,
    };
    info!(applied, enabled, "Port tagging transitions complete");

    for cmd in mgr.captured_commands() {
        println!("{}", cmd);
    }
    Ok(())
}

fn run(args: &Args) -> Result<()> {
    match &args.command {
        Command::Enable(target) => transition(args, target, true),
        Command::Disable(target) => transition(args, target, false),
        Command::Status => {
            let config = Tag8021qConfig::load_or_default(&args.config)?;
            let mgr = TaggerMgr::from_config(&config)?;
            for status in mgr.status()? {
                println!("{}", status);
            }
            Ok(())
        }
        Command::Encode {
            direction,
            switch,
            port,
        } => {
            let config = Tag8021qConfig::load_or_default(&args.config)?;
            let vid = TagVid::try_encode((*direction).into(), *switch, *port)?;
            let tag = VlanTag::new(config.tagger().tpid(), vid.as_u16());
            println!("{} (0x{:03x}) tag {:04x}{:04x}", vid, vid.as_u16(), tag.tpid, tag.tci);
            Ok(())
        }
        Command::Decode { vid } => {
            let vid = TagVid::from_tci(parse_vid(vid)?);
            let direction = vid.direction().map_or("none", |d| d.as_str());
            println!(
                "vid {} direction {} switch {} port {}",
                vid,
                direction,
                vid.switch_index(),
                vid.port_index()
            );
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = init_logging(&args.log_level) {
        eprintln!("tag8021qmgrd: {:#}", e);
        return ExitCode::FAILURE;
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
