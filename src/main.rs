#![forbid(unsafe_code)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

use circom_bench::config::ConfigOverrides;
use circom_bench::{history_cmd, run_cmd};

#[derive(Parser, Debug)]
#[command(name = "circom-bench")]
#[command(about = "Benchmark circom compilation, witness generation, Groth16 setup and proving", long_about = None)]
struct Cli {
    /// Enable verbose logging (or set CIRCOM_BENCH_LOG)
    #[arg(long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the full pipeline: compile, witness, setup, prove
    Run {
        /// TOML config file (default: circom-bench.toml if present)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Circuit source (.circom)
        #[arg(long)]
        circuit: Option<PathBuf>,
        /// Circuit name; determines artifact file names
        #[arg(long)]
        name: Option<String>,
        /// Output directory for artifacts
        #[arg(long)]
        output: Option<PathBuf>,
        /// Number of measured proving iterations
        #[arg(long)]
        iterations: Option<usize>,
        /// Powers-of-tau ceremony size (2^power constraints)
        #[arg(long)]
        ptau_power: Option<u32>,
        /// Per-command timeout in seconds (0 = none)
        #[arg(long)]
        timeout: Option<u64>,
        /// Re-run every stage even if cached artifacts are valid
        #[arg(long)]
        no_cache: bool,
        /// Verify the last proof after proving
        #[arg(long)]
        verify: bool,
        /// Path to the circom binary
        #[arg(long)]
        circom: Option<PathBuf>,
        /// Path to the node binary
        #[arg(long)]
        node: Option<PathBuf>,
        /// Path to the snarkjs binary
        #[arg(long)]
        snarkjs: Option<PathBuf>,
        /// Write machine-readable JSON record to this file
        #[arg(long)]
        json: Option<PathBuf>,
        /// Append the record to this JSONL history
        #[arg(long)]
        jsonl: Option<PathBuf>,
        /// Do not echo tool output
        #[arg(long)]
        quiet_tools: bool,
    },

    /// Summarise runs stored in a JSONL history
    History {
        #[arg(long)]
        jsonl: PathBuf,
        /// Only show runs of this circuit
        #[arg(long)]
        circuit: Option<String>,
    },
}

fn init_tracing(verbose: bool) {
    let env = std::env::var("CIRCOM_BENCH_LOG").unwrap_or_else(|_| {
        if verbose { "circom_bench=debug".to_string() } else { "circom_bench=info".to_string() }
    });
    let _ = tracing_subscriber::fmt()
        .with_span_events(FmtSpan::ACTIVE)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_env_filter(EnvFilter::new(env))
        .try_init();
}

fn main() {
    color_eyre::install().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            config,
            circuit,
            name,
            output,
            iterations,
            ptau_power,
            timeout,
            no_cache,
            verify,
            circom,
            node,
            snarkjs,
            json,
            jsonl,
            quiet_tools,
        } => {
            let overrides = ConfigOverrides {
                circuit_name: name,
                circuit_path: circuit,
                output_dir: output,
                circom,
                node,
                snarkjs,
                ptau_power,
                iterations,
                timeout_secs: timeout,
                no_cache,
                verify,
                quiet_tools,
                json,
                jsonl,
            };
            run_cmd::run(config, overrides, std::env::args().collect())
        }
        Commands::History { jsonl, circuit } => history_cmd::run(jsonl, circuit),
    };

    if let Err(e) = result {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}
