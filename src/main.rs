//! qerra CLI - Ethics-weighted resource allocation.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use qerra::{AllocationEngine, BatchPipeline, Config, DecisionArtifact};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "qerra")]
#[command(version)]
#[command(about = "Ethics-weighted resource allocation from sampled outcome distributions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "qerra.toml")]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single decision from the configured engine
    Decide {
        /// Override the configured RNG seed
        #[arg(short, long)]
        seed: Option<u64>,

        /// Print the artifact as compact JSON only
        #[arg(long)]
        json: bool,
    },

    /// Evaluate a JSONL file of scenarios
    Batch {
        /// Path to input scenarios JSONL file
        #[arg(short, long)]
        scenarios: PathBuf,

        /// Path to output JSONL file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,

    /// Show example configuration
    Example,
}

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set subscriber")
}

fn load_config(path: &Path) -> Result<Config> {
    Config::from_file(path).with_context(|| format!("Failed to load config from {path:?}"))
}

fn print_example_config() {
    let example = r#"# qerra configuration file

[engine]
mode = "optimize"          # or "threshold"
num_resources = 10
priority_weights = [3.0, 2.0, 1.0]
candidates = 8             # seeds drawn per run, best one is optimized
# seed = 42                # reproducible draws

[source]
backend = "measurement"    # "analytic" | "measurement" | "circuit"
trials = 1024
# qubit_bias = [0.75, 0.5] # probability of a 1 per qubit

# [source]
# backend = "circuit"
# shots = 1024             # omit for exact probabilities
# gates = [
#     { op = "h", qubit = 0 },
#     { op = "rx", qubit = 0, theta = 1.5707963267948966 },
#     { op = "cx", control = 0, target = 1 },
# ]

[optimizer]
max_iterations = 200
tolerance = 1e-9

[threshold]
priorities = ["high", "low"]
probability_threshold = 0.5
resource_available = 10
min_units_required = 5
# target_outcome = "0b11"  # defaults to all ones

[pool]
size = 4
"#;
    println!("{example}");
}

fn print_summary(artifact: &DecisionArtifact) {
    match artifact {
        DecisionArtifact::Optimize(d) => {
            println!("\n=== Allocation Decided ===");
            println!("Allocation:  {}", d.allocation);
            println!("Score:       {:.4}", d.score);
            println!("Seed:        {} (label {})", d.seed.allocation, d.seed.label);
            println!("Seed score:  {:.4}", d.seed_score);
            println!("Iterations:  {}", d.iterations);
            println!("Qubits:      {}", d.qubits);
        }
        DecisionArtifact::Threshold(d) => {
            println!("\n=== Threshold Decision ===");
            println!("Verdict:     {}", d.category.verdict());
            println!(
                "Target:      {} (p = {:.4}, threshold {:.2})",
                d.target_outcome.to_bitstring(d.qubits),
                d.supporting_probability,
                d.threshold_used
            );
            println!(
                "Resources:   {} available, {} required",
                d.resource_available, d.min_units_required
            );
            for (label, p) in &d.histogram {
                println!("  {label}: {p:.4}");
            }
        }
    }
    println!("ID:          {}", artifact.id());
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Example => {
            print_example_config();
        }

        Commands::Validate => {
            let config = load_config(&cli.config)?;
            config
                .source
                .build(config.priorities())
                .context("Failed to build distribution source")?;

            info!("Configuration is valid");
            info!("  Mode: {:?}", config.engine.mode);
            info!(
                "  Recipients: {}, resources: {}",
                config.engine.priority_weights.len(),
                config.engine.num_resources
            );
            info!("  Source: {:?}", config.source);
            info!(
                "  Optimizer: {} iterations, tolerance {:e}",
                config.optimizer.max_iterations, config.optimizer.tolerance
            );
            info!("  Pool size: {}", config.pool.size);
        }

        Commands::Decide { seed, json } => {
            let mut config = load_config(&cli.config)?;
            if seed.is_some() {
                config.engine.seed = seed;
            }

            let mode = config.mode().context("Failed to resolve mode")?;
            let engine = AllocationEngine::from_config(&config)
                .context("Failed to build allocation engine")?;
            let artifact = engine.run(&mode)?;

            if json {
                println!("{}", serde_json::to_string(&artifact)?);
            } else {
                println!("{}", serde_json::to_string_pretty(&artifact)?);
                print_summary(&artifact);
            }
        }

        Commands::Batch { scenarios, output } => {
            let config = load_config(&cli.config)?;
            let scenario_data = BatchPipeline::load_scenarios(&scenarios)
                .with_context(|| format!("Failed to load scenarios from {scenarios:?}"))?;

            let stats = BatchPipeline::new(config)
                .run(scenario_data, &output)
                .await?;

            println!("\n=== Batch Complete ===");
            println!("Scenarios:   {}", stats.total_scenarios);
            println!("Optimized:   {}", stats.total_optimized);
            println!("Allocate:    {}", stats.total_allocate);
            println!("Balance:     {}", stats.total_balance);
            println!("Failed:      {}", stats.total_failed);
            println!("Alloc rate:  {:.1}%", stats.allocate_rate * 100.0);
            println!("Throughput:  {:.0}/s", stats.throughput_per_sec);
            println!("Runtime:     {:.1}s", stats.runtime_secs);
            println!("Output:      {output:?}");
        }
    }

    Ok(())
}
