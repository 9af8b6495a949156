use anyhow::Result;
use clap::{Parser, Subcommand};
use recap_common::{logger, RecapError, SummarizerConfig};
use recap_llm::{HealthReport, OllamaClient, SummarizationResult, Summarizer};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Find project root by looking for .git directory
fn find_project_root() -> Option<PathBuf> {
    let mut current_dir = std::env::current_dir().ok()?;

    loop {
        if current_dir.join(".git").exists() {
            return Some(current_dir);
        }

        if !current_dir.pop() {
            break;
        }
    }

    None
}

/// .env file at the project root, if there is one
fn project_env_file() -> Option<PathBuf> {
    find_project_root()
        .map(|root| root.join(".env"))
        .filter(|path| path.exists())
}

#[derive(Parser)]
#[command(name = "recap")]
#[command(about = "Recap - map-reduce summarization of long transcripts", long_about = None)]
struct Cli {
    /// Ollama base URL
    #[arg(long, global = true)]
    ollama_url: Option<String>,

    /// Model name
    #[arg(long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize an extracted transcript ("-" reads stdin)
    Summarize {
        /// Plain-text transcript file
        input: PathBuf,

        /// Maximum chunk size in words
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Words carried over between chunks
        #[arg(long)]
        chunk_overlap: Option<usize>,

        /// Sampling temperature (0.0 - 1.0)
        #[arg(long)]
        temperature: Option<f32>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check backend connectivity and model availability
    Health {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Pull the configured model onto the backend
    Pull,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = SummarizerConfig::from_env(project_env_file().as_deref());
    if let Some(url) = cli.ollama_url {
        config.ollama_base_url = url;
    }
    if let Some(model) = cli.model {
        config.model_name = model;
    }

    match &config.log_dir {
        Some(log_dir) => logger::setup_logging(log_dir, &config.log_level)?,
        None => logger::setup_console_logging(&config.log_level)?,
    }

    match cli.command {
        Commands::Summarize {
            input,
            chunk_size,
            chunk_overlap,
            temperature,
            json,
        } => {
            if let Some(size) = chunk_size {
                config.chunk_size = size;
            }
            if let Some(overlap) = chunk_overlap {
                config.chunk_overlap = overlap;
            }
            if let Some(temperature) = temperature {
                config.temperature = temperature;
            }

            let transcript = match read_input(&input) {
                Ok(transcript) => transcript,
                Err(e) => {
                    eprintln!("Failed to read transcript {}", input.display());
                    return Ok(report_error(e));
                }
            };
            let summarizer = match Summarizer::new(config) {
                Ok(summarizer) => summarizer,
                Err(e) => return Ok(report_error(e)),
            };

            tracing::info!(
                "Summarizing {} with {} at {}",
                input.display(),
                summarizer.config().model_name,
                summarizer.config().ollama_base_url
            );

            let result = summarizer.summarize_transcript(&transcript).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_result(&result);
            }

            Ok(if result.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Health { json } => {
            let summarizer = match Summarizer::new(config) {
                Ok(summarizer) => summarizer,
                Err(e) => return Ok(report_error(e)),
            };
            let report = summarizer.check_backend_health().await;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_health(&report);
            }

            Ok(if report.connected && report.model_available {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Pull => {
            if let Err(e) = config.validate() {
                return Ok(report_error(e));
            }
            let client = OllamaClient::from_config(&config)?;

            if client.pull_model().await {
                println!("Pulled model {}", client.model());
                Ok(ExitCode::SUCCESS)
            } else {
                eprintln!("Failed to pull model {}", client.model());
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

fn report_error(e: RecapError) -> ExitCode {
    eprintln!("{}", e);
    ExitCode::from(e.exit_code())
}

fn read_input(input: &Path) -> recap_common::Result<String> {
    if input.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }

    Ok(std::fs::read_to_string(input)?)
}

fn print_result(result: &SummarizationResult) {
    if let Some(error) = &result.error {
        eprintln!("Summarization failed: {}", error);
        return;
    }

    println!("{}\n", result.summary);
    println!("Original length:   {} chars", result.original_length);
    println!("Summary length:    {} chars", result.summary_length);
    println!("Compression ratio: {:.1}x", result.compression_ratio);
    println!("Chunks processed:  {}", result.chunks_processed);
    println!("Processing time:   {:.1}s", result.processing_time_seconds);
}

fn print_health(report: &HealthReport) {
    let mark = |ok: bool| if ok { "ok" } else { "FAILED" };

    println!("Backend connection: {}", mark(report.connected));
    println!("Model available:    {}", mark(report.model_available));

    if let Some(family) = report.model_info.pointer("/details/family").and_then(|v| v.as_str()) {
        println!("Model family:       {}", family);
    }
    if let Some(size) = report.model_info.pointer("/details/parameter_size").and_then(|v| v.as_str()) {
        println!("Parameter size:     {}", size);
    }
    if let Some(error) = &report.error {
        println!("Error:              {}", error);
    }
}
