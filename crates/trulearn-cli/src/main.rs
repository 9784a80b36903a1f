//! trulearn CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use trulearn_core::model::Difficulty;

mod commands;

use commands::OutputFormat;

#[derive(Parser)]
#[command(
    name = "trulearn",
    version,
    about = "Assessment engine that tells understanding from memorization"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit an answer sheet and print the results
    Submit {
        /// Question set JSON
        #[arg(long)]
        questions: PathBuf,

        /// Answer sheet TOML
        #[arg(long)]
        answers: PathBuf,

        /// Max concurrent detection calls (default from config)
        #[arg(long)]
        parallelism: Option<usize>,

        /// Output directory (default from config)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Reprint the results of a saved attempt
    Summarize {
        /// Attempt report JSON
        #[arg(long)]
        report: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Plan (and optionally generate) the next practice round
    Practice {
        /// Attempt report JSON
        #[arg(long)]
        report: PathBuf,

        /// Only practice concepts scoring below this percentage
        #[arg(long)]
        below: Option<u32>,

        /// Reference text file to generate from
        #[arg(long)]
        reference: Option<PathBuf>,

        /// Generate the planned questions
        #[arg(long)]
        generate: bool,

        /// Where to write generated questions
        #[arg(long)]
        output: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Generate questions for a concept
    Generate {
        /// Concept to ask about
        #[arg(long)]
        concept: String,

        /// easy, medium, or hard
        #[arg(long)]
        difficulty: Option<Difficulty>,

        /// Number of questions (default from config)
        #[arg(long)]
        num_variations: Option<u32>,

        /// Reference text file to generate from
        #[arg(long)]
        reference: Option<PathBuf>,

        /// Name of a previously uploaded reference file
        #[arg(long)]
        filename: Option<String>,

        /// Write the question set here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Compare two saved attempts concept by concept
    Compare {
        /// Earlier attempt report JSON
        #[arg(long)]
        baseline: PathBuf,

        /// Later attempt report JSON
        #[arg(long)]
        current: PathBuf,

        /// Changes smaller than this many percentage points count as unchanged
        #[arg(long, default_value = "5")]
        threshold: u32,

        /// Exit code 1 if any concept regressed
        #[arg(long)]
        fail_on_regression: bool,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Upload a reference PDF for question generation and detection
    Upload {
        /// PDF to upload
        #[arg(long)]
        file: PathBuf,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Check a question set for problems
    Validate {
        /// Question set JSON
        #[arg(long)]
        questions: PathBuf,
    },

    /// Create starter config, question set, and answer sheet
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("trulearn=info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Submit {
            questions,
            answers,
            parallelism,
            output,
            format,
            config,
        } => {
            commands::submit::execute(questions, answers, parallelism, output, format, config)
                .await
        }
        Commands::Summarize { report, format } => commands::summarize::execute(report, format),
        Commands::Practice {
            report,
            below,
            reference,
            generate,
            output,
            config,
        } => {
            commands::practice::execute(report, below, reference, generate, output, config).await
        }
        Commands::Generate {
            concept,
            difficulty,
            num_variations,
            reference,
            filename,
            output,
            config,
        } => {
            commands::generate::execute(
                concept,
                difficulty,
                num_variations,
                reference,
                filename,
                output,
                config,
            )
            .await
        }
        Commands::Compare {
            baseline,
            current,
            threshold,
            fail_on_regression,
            format,
        } => {
            commands::compare::execute(baseline, current, threshold, fail_on_regression, format)
        }
        Commands::Upload { file, config } => commands::upload::execute(file, config).await,
        Commands::Validate { questions } => commands::validate::execute(questions),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
