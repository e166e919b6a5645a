// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use npc_arena::agent::{AgentKind, Bounds};
use npc_arena::metrics::export::StatsWriter;
use npc_arena::persistence;
use npc_arena::prelude::*;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn, Level};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the concurrent simulation
    Run(RunArgs),

    /// Write a random roster file
    Generate {
        #[arg(short = 'n', long, default_value_t = 50)]
        population: usize,
        #[arg(long, default_value_t = 100)]
        width: i32,
        #[arg(long, default_value_t = 100)]
        height: i32,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(short, long, default_value = "npcs.txt")]
        out: PathBuf,
    },

    /// Print movement rules and the matchup table
    Rules,
}

#[derive(Args)]
struct RunArgs {
    /// JSON config file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Start from a saved roster instead of a random population
    #[arg(short, long)]
    roster: Option<PathBuf>,
    #[arg(short = 'n', long)]
    population: Option<usize>,
    #[arg(long)]
    width: Option<i32>,
    #[arg(long)]
    height: Option<i32>,
    /// Run length in seconds
    #[arg(short, long)]
    duration: Option<u64>,
    #[arg(long)]
    sleep_min: Option<u64>,
    #[arg(long)]
    sleep_max: Option<u64>,
    #[arg(long)]
    dice_min: Option<u32>,
    #[arg(long)]
    dice_max: Option<u32>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    log_file: Option<PathBuf>,
    #[arg(long)]
    stats_csv: Option<PathBuf>,
    #[arg(long)]
    report: Option<PathBuf>,
    #[arg(long)]
    save_survivors: Option<PathBuf>,
    #[arg(long)]
    no_map: bool,
    #[arg(long)]
    no_progress: bool,
    #[arg(long)]
    quiet_events: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let program_start = Instant::now();

    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run(args) => run_simulation(args).await?,
        Commands::Generate { population, width, height, seed, out } => {
            generate_roster(population, Bounds::new(width, height), seed, &out)?;
        }
        Commands::Rules => print_rules(RuleTable::global()),
    }

    info!("Total runtime: {:.2}s", program_start.elapsed().as_secs_f64());
    Ok(())
}

fn build_config(args: &RunArgs) -> Result<SimConfig> {
    let mut config = match &args.config {
        Some(path) => SimConfig::from_json_file(path)
            .with_context(|| format!("cannot read config {}", path.display()))?,
        None => SimConfig::default(),
    };

    if let Some(n) = args.population {
        config.population = n;
    }
    if let Some(w) = args.width {
        config.width = w;
    }
    if let Some(h) = args.height {
        config.height = h;
    }
    if let Some(d) = args.duration {
        config.duration = Duration::from_secs(d);
    }
    if let Some(ms) = args.sleep_min {
        config.sleep_min_ms = ms;
    }
    if let Some(ms) = args.sleep_max {
        config.sleep_max_ms = ms;
    }
    if let Some(v) = args.dice_min {
        config.dice_min = v;
    }
    if let Some(v) = args.dice_max {
        config.dice_max = v;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if args.log_file.is_some() {
        config.log_file = args.log_file.clone();
    }
    if args.no_map {
        config.render_map = false;
    }
    if args.no_progress {
        config.show_progress = false;
    }
    if args.quiet_events {
        config.console_events = false;
    }

    config.validate()?;
    Ok(config)
}

async fn run_simulation(args: RunArgs) -> Result<()> {
    let config = build_config(&args)?;

    print_rules(RuleTable::global());

    let mut sim = Simulation::new(config.clone());
    if let Some(path) = &args.roster {
        let loaded = persistence::load_roster_file(path, config.bounds())
            .with_context(|| format!("cannot load roster {}", path.display()))?;
        if loaded.skipped > 0 {
            warn!("Skipped {} malformed roster records", loaded.skipped);
        }
        anyhow::ensure!(loaded.loaded > 0, "roster {} holds no usable agents", path.display());
        info!("Loaded {} NPCs from {}", loaded.loaded, path.display());
        sim = sim.with_roster(loaded.roster);
    } else {
        info!("Initializing game with {} NPCs...", config.population);
    }

    let stop = sim.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, stopping");
            stop.cancel();
        }
    });

    info!("Starting game for {}s...", config.duration.as_secs());
    let report = sim.run().await?;

    println!("\n{}\n", report.summary());

    if let Some(path) = &args.stats_csv {
        let mut writer = StatsWriter::create(path)?;
        writer.write_all(&sim.metrics.get_snapshots())?;
        info!("Statistics saved to: {}", path.display());
    }

    if let Some(path) = &args.report {
        std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
        info!("Report saved to: {}", path.display());
    }

    if let Some(path) = &args.save_survivors {
        let saved = persistence::save_roster_file(&sim.roster(), path, true)?;
        info!("Saved {} survivors to {}", saved, path.display());
    }

    if !report.failed_workers.is_empty() {
        warn!("Workers that did not shut down cleanly: {:?}", report.failed_workers);
    }

    Ok(())
}

fn generate_roster(population: usize, bounds: Bounds, seed: Option<u64>, out: &Path) -> Result<()> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let roster = Roster::seeded(population, bounds, &mut rng)?;
    let written = persistence::save_roster_file(&roster, out, false)?;
    info!("Wrote {} NPCs to {}", written, out.display());
    Ok(())
}

fn print_rules(rules: &RuleTable) {
    println!("\nNPC Types: Rogue, Orc, Werewolf, Pegasus");
    println!("Battle Rules:");
    for attacker in AgentKind::ALL {
        let victims: Vec<&str> = AgentKind::ALL
            .iter()
            .filter(|d| rules.can_kill(attacker, **d))
            .map(|d| d.name())
            .collect();
        if victims.is_empty() {
            println!("  - {} doesn't kill anyone", attacker);
        } else {
            println!("  - {} kills {}", attacker, victims.join(", "));
        }
    }

    println!("\nMovement rules:");
    for kind in rules.kinds() {
        println!(
            "  - {}: move {}, kill distance {}",
            kind,
            rules.move_distance(kind),
            rules.kill_distance(kind)
        );
    }
    println!();
}
