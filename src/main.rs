use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use encounter_copy::{Config, CopyResult, Copier};
use encounter_game::{Game, PenaltyOptions, Variant};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "encounter-copy")]
#[command(about = "Copy Encounter games through the admin UI")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Run in headless mode (overrides config)
    #[arg(long, global = true)]
    headless: bool,

    /// Set a parameter (can be used multiple times)
    #[arg(short = 'P', long = "param", value_name = "KEY=VALUE", global = true)]
    params: Vec<String>,

    /// Verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (only errors)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Capture a game into a snapshot
    Save { config: PathBuf },

    /// Replay a snapshot into a game
    Load { config: PathBuf },

    /// Validate a job file without running it
    Check { config: PathBuf },

    /// Add penalty bonuses to a level of a snapshot and print the gate code
    Penalty {
        /// Snapshot to edit in place
        snapshot: PathBuf,

        /// Level that gets the bonuses
        #[arg(long)]
        level: u32,

        /// A right answer (repeat for composite answers)
        #[arg(long = "right", required = true)]
        right: Vec<String>,

        /// A candidate answer; join composite parts with '+'
        #[arg(long = "variant", required = true)]
        variants: Vec<String>,

        #[arg(long, default_value_t = 41)]
        seed: u64,

        /// Shuffle the bonuses
        #[arg(long)]
        shuffle: bool,

        /// Appended to the wrong-answer message
        #[arg(long)]
        penalty: Option<String>,
    },
}

fn parse_variant(arg: &str) -> Variant {
    if arg.contains('+') {
        Variant::Composite(arg.split('+').map(|p| p.trim().to_string()).collect())
    } else {
        Variant::Single(arg.to_string())
    }
}

fn print_check(config: &Config) {
    println!("Config valid: {}", config.name);
    if let Some(ref save) = config.save {
        println!("  Save: game {} on {}", save.game_id, save.domain);
        println!("    Snapshot: {}", save.path.display());
        if let Some(ref levels) = save.levels {
            println!("    Levels: {:?}", levels);
        }
        if !save.skip.is_empty() {
            let skip: Vec<_> = save.skip.iter().map(|k| k.as_str()).collect();
            println!("    Skip: {}", skip.join(", "));
        }
    }
    if let Some(ref load) = config.load {
        println!("  Load: {} into game {} on {}", load.path.display(), load.game_id, load.domain);
        if let Some(ref levels) = load.levels {
            println!("    Levels: {:?}", levels);
        }
    }
    if !config.params.is_empty() {
        println!("  Parameters: {}", config.params.len());
        for (name, def) in &config.params {
            let req = if def.required { " (required)" } else { "" };
            let desc = def.description.as_deref().unwrap_or("");
            println!("    - {}{}: {}", name, req, desc);
        }
    }
}

fn print_result(result: &CopyResult) {
    println!();
    if result.success {
        println!("✓ Success");
    } else {
        println!("✗ Failed");
        if let Some(ref error) = result.error {
            println!("  Error: {}", error);
        }
    }
    if let Some(n) = result.levels_saved {
        println!("  Levels saved: {}", n);
    }
    if let Some(n) = result.levels_loaded {
        println!("  Levels loaded: {}", n);
    }
    println!("  Duration: {}ms", result.duration_ms);
}

#[tokio::main]
async fn main() -> encounter_copy::Result<()> {
    let cli = Cli::parse();

    let level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        }
    };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    let params = encounter_copy::Params::from_args(&cli.params)?;

    let (config_path, save) = match cli.command {
        Command::Save { config } => (config, true),
        Command::Load { config } => (config, false),
        Command::Check { config } => {
            let config = Config::load_with_params(&config, &params)?;
            print_check(&config);
            return Ok(());
        }
        Command::Penalty {
            snapshot,
            level,
            right,
            variants,
            seed,
            shuffle,
            penalty,
        } => {
            let mut game = Game::from_file(&snapshot)?;
            let right: BTreeSet<String> = right.into_iter().collect();
            let variants: Vec<Variant> = variants.iter().map(|v| parse_variant(v)).collect();
            let options = PenaltyOptions {
                seed,
                shuffle,
                penalty,
            };
            let gate = encounter_copy::add_penalty_bonuses(&mut game, level, &right, &variants, &options)?;
            game.to_file(&snapshot)?;
            println!("{}", gate);
            return Ok(());
        }
    };

    let mut config = Config::load_with_params(&config_path, &params)?;
    if cli.headless {
        config.browser.headless = true;
    }

    println!("Running: {}", config.name);

    let mut copier = Copier::launch(&config.browser).await?;
    let result = if save {
        copier.save(&config).await?
    } else {
        copier.load(&config).await?
    };
    print_result(&result);

    copier.close().await?;

    if !result.success {
        std::process::exit(1);
    }

    Ok(())
}
