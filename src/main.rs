//! zhelezo - Personal strength training log
//!
//! железо - "iron", what gets lifted

use anyhow::{Result, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};

use zhelezo::db::{Database, SetEntry, Workout};
use zhelezo::ml::{Analytics, PlateSet, ProgressAdvisor, estimate_weight_for_rep_target};

const DEFAULT_DB_PATH: &str = "zhelezo.db";

/// User id for records logged from the local CLI
const LOCAL_USER: i64 = 0;

#[derive(Parser)]
#[command(name = "zhelezo")]
#[command(author, version, about = "железо - Personal strength training log")]
struct Cli {
    /// Database file path
    #[arg(long, default_value = DEFAULT_DB_PATH)]
    db: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log a workout session
    Log {
        /// Exercise name (e.g., "жим лёжа")
        exercise: String,

        /// Reps per set
        #[arg(short, long, num_args = 1.., required = true)]
        reps: Vec<i32>,

        /// Weight per set in kg (one value applies to all sets)
        #[arg(short, long, num_args = 1.., required = true)]
        weights: Vec<f64>,

        /// Optional notes
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// List workout history
    List {
        /// Number of sessions to show
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Dump as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show statistics
    Stats {
        /// Filter by exercise name
        exercise: Option<String>,
    },

    /// Suggest next-session weights for an exercise
    Suggest {
        /// Exercise name
        exercise: String,

        /// Estimate an equivalent weight for this rep target instead
        #[arg(long)]
        target_reps: Option<i32>,
    },

    /// Start Telegram bot
    Bot {
        /// Telegram bot token (or set TELOXIDE_TOKEN env var)
        #[arg(short, long, env = "TELOXIDE_TOKEN")]
        token: String,
    },
}

/// Smallest weight step achievable on the bar (a plate pair)
const BAR_STEP_KG: f64 = 2.5;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Log { exercise, reps, weights, notes } => {
            let db = Database::open(&cli.db)?;
            let weights = if weights.len() == 1 {
                vec![weights[0]; reps.len()]
            } else if weights.len() == reps.len() {
                weights
            } else {
                bail!(
                    "expected {} weights (one per set) or a single value, got {}",
                    reps.len(),
                    weights.len()
                );
            };
            if reps.iter().any(|r| *r <= 0) {
                bail!("reps must be positive");
            }
            if weights.iter().any(|w| *w < 0.0) {
                bail!("weights must be non-negative");
            }

            let sets: Vec<SetEntry> = reps
                .iter()
                .zip(weights.iter())
                .map(|(reps, weight)| SetEntry { reps: *reps, weight: *weight })
                .collect();

            let workout = Workout {
                id: None,
                user_id: LOCAL_USER,
                date: Utc::now(),
                exercise: exercise.clone(),
                sets,
                notes,
            };
            let id = db.add_workout(&workout)?;
            println!(
                "Logged: {} - {} sets, volume {:.1} kg (id: {})",
                exercise,
                workout.sets.len(),
                workout.volume(),
                id
            );
        }

        Commands::List { limit, json } => {
            let db = Database::open(&cli.db)?;
            let workouts = db.get_workouts(LOCAL_USER)?;
            let shown: Vec<_> = workouts.into_iter().take(limit).collect();

            if json {
                println!("{}", serde_json::to_string_pretty(&shown)?);
            } else {
                println!("Recent workouts:");
                println!("{:-<60}", "");
                for workout in &shown {
                    let sets: Vec<String> = workout
                        .sets
                        .iter()
                        .map(|s| format!("{}x{}", s.reps, s.weight))
                        .collect();
                    println!(
                        "{} | {:20} | {} | {}",
                        workout.date.format("%Y-%m-%d %H:%M"),
                        workout.exercise,
                        sets.join(" "),
                        workout.notes.as_deref().unwrap_or("-")
                    );
                }
            }
        }

        Commands::Stats { exercise } => {
            let db = Database::open(&cli.db)?;
            let workouts = db.get_workouts(LOCAL_USER)?;
            let analytics = Analytics::new(workouts);

            println!("Workout Statistics");
            println!("{:-<40}", "");

            if let Some(ex) = exercise {
                match analytics.exercise_stats(&ex) {
                    Some(stats) => {
                        println!("Exercise: {}", stats.name);
                        println!("Sessions: {}", stats.sessions);
                        println!("Average weight: {:.1} kg", stats.avg_weight);
                        println!("Record weight: {:.1} kg", stats.record_weight);
                        println!("Average volume: {:.1} kg", stats.avg_volume);
                        println!("Record volume: {:.1} kg", stats.record_volume);
                    }
                    None => println!("No records for '{}'", ex),
                }
            } else {
                for stats in analytics.all_stats() {
                    println!(
                        "{:20} | {} sessions | record {:.1} kg",
                        stats.name, stats.sessions, stats.record_weight
                    );
                }
                println!(
                    "Weekly frequency: {:.1} sessions/week",
                    analytics.weekly_frequency()
                );
            }
        }

        Commands::Suggest { exercise, target_reps } => {
            let db = Database::open(&cli.db)?;
            let last = db.last_workout(LOCAL_USER, &exercise)?;

            let Some(last) = last.filter(|w| !w.sets.is_empty()) else {
                bail!("no logged sets for '{}'", exercise);
            };

            match target_reps {
                Some(target) => {
                    // Rep-target estimate from the heaviest set
                    let top = last
                        .sets
                        .iter()
                        .max_by(|a, b| a.weight.total_cmp(&b.weight))
                        .copied()
                        .unwrap_or(last.sets[0]);
                    let estimate =
                        estimate_weight_for_rep_target(top.weight, top.reps, target);
                    println!(
                        "{}: {}x{} -> ~{} kg for {} reps",
                        exercise, top.reps, top.weight, estimate, target
                    );
                }
                None => {
                    let advisor = ProgressAdvisor::new(PlateSet::steps(BAR_STEP_KG, 500.0)?);
                    let suggestions = advisor.recommend(&last.sets);
                    let parts: Vec<String> =
                        suggestions.iter().map(|w| format!("{}", w)).collect();
                    println!("{}: next session {} kg", exercise, parts.join(", "));
                }
            }
        }

        Commands::Bot { token } => {
            println!("Starting Telegram bot...");
            println!("Database: {}", cli.db);
            zhelezo::bot::run_bot(token, &cli.db).await?;
        }
    }

    Ok(())
}
