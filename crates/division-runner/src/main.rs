use std::path::PathBuf;
use std::sync::Arc;

use adjudication::{Adjudicator, NoVerdictPolicy, Side};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use division_runner::{load_transcript, HttpOracle, RunnerConfig};
use tracing::info;

#[derive(Parser)]
#[command(name = "division-runner", version, about = "Multi-layer debate adjudication")]
struct Cli {
    /// TOML configuration file. Environment variables override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Adjudicate a transcript and print the report.
    Adjudicate {
        /// Transcript document (JSON).
        #[arg(long)]
        transcript: PathBuf,
        /// Write the structured result here as JSON.
        #[arg(long)]
        output: Option<PathBuf>,
        /// Write the text report here.
        #[arg(long)]
        report: Option<PathBuf>,
        /// Judges per engagement pass.
        #[arg(long)]
        judges: Option<usize>,
        /// Award this side when every layer fails instead of erroring.
        #[arg(long, value_enum)]
        no_verdict_default: Option<SideArg>,
    },
    /// Validate configuration and ping the endpoint.
    Check,
}

#[derive(Clone, Copy, ValueEnum)]
enum SideArg {
    Proposition,
    Opposition,
}

impl From<SideArg> for Side {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::Proposition => Side::Proposition,
            SideArg::Opposition => Side::Opposition,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config =
        RunnerConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Command::Adjudicate {
            transcript,
            output,
            report,
            judges,
            no_verdict_default,
        } => {
            if let Some(judges) = judges {
                config.adjudication.engagement_judges = judges;
            }
            if let Some(side) = no_verdict_default {
                config.adjudication.no_verdict = NoVerdictPolicy::DefaultTo(side.into());
            }
            config.validate().context("Invalid configuration")?;
            adjudicate(&config, transcript, output, report).await
        }
        Command::Check => check(&config).await,
    }
}

async fn adjudicate(
    config: &RunnerConfig,
    transcript_path: PathBuf,
    output: Option<PathBuf>,
    report_path: Option<PathBuf>,
) -> Result<()> {
    let transcript = load_transcript(&transcript_path)?;
    let oracle = HttpOracle::new(config.endpoint.clone(), config.retry.clone())
        .context("Failed to build HTTP oracle")?;
    info!(
        endpoint = %config.endpoint.base_url,
        model = %config.endpoint.model,
        judges = config.adjudication.engagement_judges,
        "Division runner starting"
    );

    let adjudicator = Adjudicator::new(Arc::new(oracle), &config.adjudication)?;
    let result = adjudicator
        .adjudicate(&transcript)
        .await
        .with_context(|| format!("Adjudication of {} failed", transcript_path.display()))?;

    println!("{}", result.report);

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&result.division)?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write result to {}", path.display()))?;
        info!(path = %path.display(), "Wrote division result");
    }
    if let Some(path) = report_path {
        std::fs::write(&path, &result.report)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!(path = %path.display(), "Wrote report");
    }
    Ok(())
}

async fn check(config: &RunnerConfig) -> Result<()> {
    let oracle = HttpOracle::new(config.endpoint.clone(), config.retry.clone())
        .context("Failed to build HTTP oracle")?;
    let models = oracle
        .list_models()
        .await
        .with_context(|| format!("Endpoint {} is not reachable", config.endpoint.base_url))?;

    info!(
        endpoint = %config.endpoint.base_url,
        models = models.len(),
        "Endpoint reachable"
    );
    if !models.is_empty() && !models.iter().any(|m| m == &config.endpoint.model) {
        tracing::warn!(
            model = %config.endpoint.model,
            "Configured model is not listed by the endpoint"
        );
    }
    println!(
        "ok: {} ({} models, using {})",
        config.endpoint.base_url,
        models.len(),
        config.endpoint.model
    );
    Ok(())
}
