//! Tennis Prediction CLI
//!
//! Elo ratings, player statistics and win probabilities from match history.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tennis::{Config, Result, Surface};

#[derive(Parser)]
#[command(name = "tennis")]
#[command(about = "Tennis match prediction from ratings and player statistics", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Match data file (overrides the config)
    #[arg(short, long)]
    data: Option<String>,

    /// Reference date for rating decay (defaults to the last match date)
    #[arg(long)]
    as_of: Option<NaiveDate>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show players ranked by Elo rating
    Rankings {
        /// Number of players to show
        #[arg(long, default_value = "20")]
        limit: usize,
        /// Minimum matches played to be ranked
        #[arg(long, default_value = "10")]
        min_matches: usize,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Show a player summary
    Player {
        /// Player id or name
        player: String,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Predict a match between two players
    Predict {
        /// First player id or name
        player_a: String,
        /// Second player id or name
        player_b: String,
        /// Court surface
        #[arg(long)]
        surface: Option<Surface>,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Backtest Elo-only against the hybrid model
    Validate {
        /// Last day of the training window
        #[arg(long)]
        train_end: Option<NaiveDate>,
        /// First day of the test window
        #[arg(long)]
        test_start: Option<NaiveDate>,
        /// Last day of the test window
        #[arg(long)]
        test_end: Option<NaiveDate>,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Build the rolling feature matrix
    Features {
        /// Write the matrix as JSON to this file
        #[arg(long)]
        output: Option<String>,
        /// Evaluate the Elo baseline classifier on a chronological split
        #[arg(long)]
        evaluate: bool,
    },
    /// Initialize a new project with default config
    Init,
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use table or json.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let mut config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };
    if let Some(path) = cli.data {
        config.data.matches_path = path;
    }

    let result = match cli.command {
        Commands::Rankings {
            limit,
            min_matches,
            format,
        } => commands::rankings(&config, cli.as_of, limit, min_matches, format),
        Commands::Player { player, format } => commands::player(&config, cli.as_of, &player, format),
        Commands::Predict {
            player_a,
            player_b,
            surface,
            format,
        } => commands::predict(&config, cli.as_of, &player_a, &player_b, surface, format),
        Commands::Validate {
            train_end,
            test_start,
            test_end,
            format,
        } => commands::validate(&config, train_end, test_start, test_end, format),
        Commands::Features { output, evaluate } => commands::features(&config, output, evaluate),
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use tennis::data::{load_matches, MatchTable};
    use tennis::features::{build_match_matrix, RatingEngine, RollingFeatureBuilder, StatisticsEngine};
    use tennis::predict::{format_matchup, Reporter};
    use tennis::validation::{evaluate_classifier, BacktestDates, BacktestHarness, ChronologicalSplit, EloBaseline};

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all("data")?;
        println!("Created data/ directory");
        println!("\nNext steps:");
        println!("  1. Edit {} to customize settings", config_path);
        println!("  2. Export match history as a JSON array to {}", config.data.matches_path);
        println!("  3. Run 'tennis rankings' to see current ratings");
        println!("  4. Run 'tennis predict <PLAYER_A> <PLAYER_B> --surface clay' to make predictions");
        Ok(())
    }

    /// Load matches and replay them into ratings and statistics
    fn load(config: &Config, as_of: Option<NaiveDate>) -> Result<(RatingEngine, StatisticsEngine)> {
        let table = load_matches(&config.data.matches_path)?;
        let mut ratings = RatingEngine::new(config.elo.clone());
        if config.elo.apply_decay {
            ratings.set_as_of(as_of.or_else(|| table.last_date()));
        }
        ratings.calculate_ratings_from_matches(&table);
        log::info!(
            "Rated {} players from {} matches",
            ratings.player_count(),
            table.len()
        );
        let stats = StatisticsEngine::from_config(table, config);
        Ok((ratings, stats))
    }

    pub fn rankings(
        config: &Config,
        as_of: Option<NaiveDate>,
        limit: usize,
        min_matches: usize,
        format: OutputFormat,
    ) -> Result<()> {
        let (ratings, stats) = load(config, as_of)?;
        let reporter = Reporter::new(&ratings, &stats, config);
        let entries = reporter.rankings(min_matches, limit);

        match format {
            OutputFormat::Table => {
                println!("Elo Rankings (min {} matches)", min_matches);
                println!("───────────────────────────────────────────────────────────");
                println!("{:>4}  {:<28} {:>7} {:>8} {:>7}", "#", "Player", "Elo", "Matches", "Win %");
                for e in &entries {
                    let name = e.name.as_deref().unwrap_or(e.player_id.as_str());
                    let win = e
                        .win_pct
                        .map_or_else(|| "-".to_string(), |p| format!("{:.1}", p * 100.0));
                    println!(
                        "{:>4}  {:<28} {:>7.0} {:>8} {:>7}",
                        e.rank, name, e.rating, e.matches, win
                    );
                }
            }
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        }
        Ok(())
    }

    pub fn player(config: &Config, as_of: Option<NaiveDate>, query: &str, format: OutputFormat) -> Result<()> {
        let (ratings, stats) = load(config, as_of)?;
        let reporter = Reporter::new(&ratings, &stats, config);
        let id = reporter.find_player(query)?;
        let summary = reporter.player_summary(&id)?;

        match format {
            OutputFormat::Table => {
                let pct = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |p| format!("{:.1}%", p * 100.0));
                let num = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |x| format!("{:.2}", x));

                println!("{} ({})", summary.name.as_deref().unwrap_or(id.as_str()), id);
                println!("───────────────────────────────");
                println!("  Elo:            {:.0}", summary.rating);
                for (surface, rating) in &summary.surface_ratings {
                    println!("    {:<13}{:.0}", format!("{}:", surface), rating);
                }
                println!(
                    "  Career:         {}-{} ({})",
                    summary.career.wins,
                    summary.career.losses,
                    pct(summary.career.win_pct)
                );
                println!(
                    "  Recent form:    {}-{} ({})",
                    summary.recent_form.wins,
                    summary.recent_form.losses,
                    pct(summary.recent_form.win_pct)
                );
                if let Some(latest) = &summary.latest_match {
                    let result = if latest.won { "won" } else { "lost" };
                    println!("  Last match:     {} ({}, {} days ago)", latest.date, result, latest.days_ago);
                }

                println!("\nSurfaces");
                println!("───────────────────────────────");
                for (surface, record) in &summary.surface_stats {
                    println!(
                        "  {:<8}{:>3}-{:<3} {}",
                        surface.name(),
                        record.wins,
                        record.losses,
                        pct(record.win_pct)
                    );
                }

                println!("\nTournament levels");
                println!("───────────────────────────────");
                for (level, record) in &summary.level_stats {
                    println!(
                        "  {:<14}{:>3}-{:<3} {}",
                        level.to_string(),
                        record.wins,
                        record.losses,
                        pct(record.win_pct)
                    );
                }

                let m = &summary.metrics;
                println!("\nDetailed metrics");
                println!("───────────────────────────────");
                println!("  Avg winning margin:      {}", num(m.avg_winning_margin));
                println!("  Avg minutes (wins):      {}", num(m.avg_minutes_for_wins));
                println!("  First set win:           {}", pct(m.first_set_win_pct));
                println!("  Second set win:          {}", pct(m.second_set_win_pct));
                println!("  Ace %:                   {}", num(m.ace_pct));
                println!(
                    "  Most lost surface:       {}",
                    m.most_lost_surface.map_or_else(|| "-".to_string(), |s| s.to_string())
                );
                println!("  Avg losing game time:    {}", num(m.avg_losing_game_time));
                println!("  Form (last 10 wins):     {}", num(m.form_last_10_wins));
                println!("  Form (last 5 wins):      {}", num(m.form_last_5_wins));
            }
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        }
        Ok(())
    }

    pub fn predict(
        config: &Config,
        as_of: Option<NaiveDate>,
        player_a: &str,
        player_b: &str,
        surface: Option<Surface>,
        format: OutputFormat,
    ) -> Result<()> {
        let (ratings, stats) = load(config, as_of)?;
        let reporter = Reporter::new(&ratings, &stats, config);
        let a = reporter.find_player(player_a)?;
        let b = reporter.find_player(player_b)?;
        let report = reporter.matchup(&a, &b, surface)?;

        match format {
            OutputFormat::Table => print!("{}", format_matchup(&report)),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        }
        Ok(())
    }

    pub fn validate(
        config: &Config,
        train_end: Option<NaiveDate>,
        test_start: Option<NaiveDate>,
        test_end: Option<NaiveDate>,
        format: OutputFormat,
    ) -> Result<()> {
        let table = load_matches(&config.data.matches_path)?;
        let dates = BacktestDates {
            train_start: None,
            train_end,
            test_start,
            test_end,
        };
        let harness = BacktestHarness::new(&table, config, dates)?;
        let comparison = harness.compare_models();

        match format {
            OutputFormat::Table => print!("{}", comparison),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&comparison)?),
        }
        Ok(())
    }

    pub fn features(config: &Config, output: Option<String>, evaluate: bool) -> Result<()> {
        let table: MatchTable = load_matches(&config.data.matches_path)?;
        let builder = RollingFeatureBuilder::new(config.rolling.clone(), &config.elo);
        let history = builder.build(&table);
        let rows = build_match_matrix(&table, &history);
        println!(
            "Built {} player rows and {} matrix rows from {} matches",
            history.rows().len(),
            rows.len(),
            table.len()
        );

        if let Some(path) = output {
            std::fs::write(&path, serde_json::to_string(&rows)?)?;
            println!("Wrote feature matrix to {}", path);
        }

        if evaluate {
            let split = ChronologicalSplit::from_config(&table, &config.backtest)?;
            let mut model = EloBaseline::default();
            let metrics = evaluate_classifier(&mut model, &rows, &split)?;
            println!("\n{}", metrics);
        }
        Ok(())
    }
}
