//! Polygraph CLI
//!
//! Command-line front end for the fact-checking pipeline:
//! - `check`: verify one claim
//! - `batch`: verify a file of claims concurrently
//! - `serve`: HTTP form + JSON API
//! - `eval`: run the arithmetic evaluator alone (no credentials needed)
//!
//! Logs go to stderr (`RUST_LOG`, default `polygraph=info`); stdout carries
//! only results.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use polygraph_agent::{AgentConfig, Pipeline, PipelineState, Route, Stage};

mod batch;
mod serve;

#[derive(Parser)]
#[command(name = "polygraph")]
#[command(author, version, about = "Polygraph: claim checking with routed evidence")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify a single claim and print its verdict.
    Check {
        /// The claim to verify
        claim: String,
        /// Print the run record as JSON
        #[arg(long)]
        json: bool,
        /// Print the stages visited to stderr
        #[arg(long)]
        trace: bool,
    },

    /// Verify every claim in a file.
    ///
    /// Input is a CSV table, a JSON array of strings, or one claim per line.
    /// A `.csv` output echoes the rows with `answers` and `error` columns;
    /// anything else gets a JSON array of `{claim, verdict, error}`. Order is
    /// always the input order.
    Batch {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Claim column of a CSV input
        #[arg(long, default_value = batch::DEFAULT_CLAIM_COLUMN)]
        column: String,
        /// Claims processed at once
        #[arg(long, default_value_t = 4)]
        concurrency: usize,
    },

    /// Serve the HTML form and JSON API.
    Serve {
        #[arg(long, default_value = "127.0.0.1:8000")]
        listen: SocketAddr,
    },

    /// Evaluate an arithmetic expression or equality offline.
    Eval {
        /// e.g. `sin(90) = 1` or `2^10 - 24`
        #[arg(allow_hyphen_values = true)]
        expression: String,
    },
}

#[derive(Debug, Serialize)]
struct CheckRecord<'a> {
    claim: &'a str,
    verdict: Option<bool>,
    route: Option<Route>,
    stages: &'a [Stage],
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("polygraph=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_pipeline() -> Result<Pipeline> {
    let config = AgentConfig::from_env().context("loading configuration")?;
    Pipeline::from_config(&config).context("building pipeline")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Commands::Check { claim, json, trace } => cmd_check(&claim, json, trace).await,
        Commands::Batch {
            input,
            output,
            column,
            concurrency,
        } => {
            let pipeline = Arc::new(build_pipeline()?);
            batch::cmd_batch(pipeline, &input, &output, &column, concurrency).await
        }
        Commands::Serve { listen } => {
            let pipeline = Arc::new(build_pipeline()?);
            serve::serve(pipeline, listen).await
        }
        Commands::Eval { expression } => cmd_eval(&expression),
    }
}

async fn cmd_check(claim: &str, json: bool, trace: bool) -> Result<()> {
    let pipeline = build_pipeline()?;
    let state = pipeline
        .run(claim)
        .await
        .with_context(|| format!("checking claim {claim:?}"))?;

    if trace {
        print_trace(&state);
    }

    if json {
        let record = CheckRecord {
            claim: state.claim().as_str(),
            verdict: state.verdict(),
            route: state.route(),
            stages: state.stages(),
        };
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        println!("{}", state.verdict().unwrap_or(false));
    }
    Ok(())
}

fn print_trace(state: &PipelineState) {
    eprintln!("{} {}", "run".cyan().bold(), state.run_id());
    for stage in state.stages() {
        eprintln!("  {} {:?}", "->".dimmed(), stage);
    }
    if let Some(route) = state.route() {
        eprintln!("  {} {}", "route".bold(), route);
    }
    if let Some(query) = state.search_query() {
        eprintln!("  {} {}", "query".bold(), query);
        eprintln!("  {} {}", "evidence".bold(), state.evidence().len());
    }
    let verdict = match state.verdict() {
        Some(true) => "true".green().bold(),
        Some(false) => "false".red().bold(),
        None => "none".yellow().bold(),
    };
    eprintln!("  {} {}", "verdict".bold(), verdict);
}

fn cmd_eval(expression: &str) -> Result<()> {
    let holds = polygraph_calc::check_equality(expression, polygraph_calc::DEFAULT_EPSILON)
        .with_context(|| format!("evaluating {expression:?}"))?;
    if !expression.contains('=') {
        let value = polygraph_calc::evaluate(expression)?;
        println!("{value}");
    }
    println!("{holds}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["polygraph", "check", "2 + 2 = 4", "--json"]).unwrap();
        assert!(matches!(cli.command, Commands::Check { json: true, trace: false, .. }));

        let cli = Cli::try_parse_from(["polygraph", "batch", "-i", "in.txt", "-o", "out.json"]).unwrap();
        assert!(matches!(cli.command, Commands::Batch { concurrency: 4, ref column, .. } if column == "texts"));

        let cli = Cli::try_parse_from(["polygraph", "serve"]).unwrap();
        match cli.command {
            Commands::Serve { listen } => assert_eq!(listen.port(), 8000),
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn eval_reports_errors() {
        assert!(cmd_eval("2 + 2 = 4").is_ok());
        assert!(cmd_eval("1 / 0").is_err());
        assert!(cmd_eval("import os").is_err());
    }
}
