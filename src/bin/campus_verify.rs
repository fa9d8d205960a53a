//! Campus Verify developer CLI
//!
//! Runs the local stages of the verification pipeline against real files.
//! No collaborator is contacted.
//!
//! # Usage
//!
//! ```bash
//! # Analyze a downloaded student certificate
//! campus_verify analyze ogrenci_belgesi.pdf
//!
//! # Check an address against a claimed institution
//! campus_verify match-domain ahmet@aybu.edu.tr "ANKARA YILDIRIM BEYAZIT ÜNİVERSİTESİ"
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use campus_verify::config::VerifyConfig;
use campus_verify::document::{DocumentAnalyzer, DocumentUpload};
use campus_verify::domain_match;

#[derive(Parser)]
#[command(name = "campus_verify")]
#[command(version)]
#[command(about = "Local checks of the student verification pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, short = 'o', global = true, default_value = "pretty", value_enum)]
    format: OutputFormat,

    /// YAML config file (document limits)
    #[arg(long, global = true, env = "CAMPUS_VERIFY_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the document analyzer on a PDF
    Analyze {
        file: PathBuf,
    },

    /// Run the domain matcher
    MatchDomain {
        email: String,
        institution: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campus_verify=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Analyze { file } => cmd_analyze(file, cli.config.as_ref(), cli.format).await,
        Commands::MatchDomain { email, institution } => {
            cmd_match_domain(email, institution, cli.format)
        }
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// Ok(true) when the document is accepted
async fn cmd_analyze(
    file: &PathBuf,
    config: Option<&PathBuf>,
    format: OutputFormat,
) -> anyhow::Result<bool> {
    let config = match config {
        Some(path) => VerifyConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => VerifyConfig::default(),
    };

    let bytes = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let mime = if file
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
    {
        "application/pdf"
    } else {
        "application/octet-stream"
    };

    let analyzer = DocumentAnalyzer::new(config.document);
    let result = analyzer.analyze(DocumentUpload::new(bytes, mime)).await;

    match (format, &result) {
        (OutputFormat::Json, Ok(claim)) => {
            println!("{}", serde_json::json!({ "accepted": true, "claim": claim }));
        }
        (OutputFormat::Json, Err(reason)) => {
            println!(
                "{}",
                serde_json::json!({
                    "accepted": false,
                    "reason": reason.to_string(),
                    "message": reason.user_message(),
                })
            );
        }
        (OutputFormat::Pretty, Ok(claim)) => {
            println!("{} Document accepted", "OK".green().bold());
            println!("  {:<12} {}", "Institution".dimmed(), claim.institution_display());
            println!("  {:<12} {}", "Department".dimmed(), claim.department_display());
            println!("  {:<12} {}", "Class".dimmed(), claim.class_year_display());
        }
        (OutputFormat::Pretty, Err(reason)) => {
            println!("{} {}", "REJECTED".red().bold(), reason);
            println!("  {}", reason.user_message().yellow());
        }
    }

    Ok(result.is_ok())
}

fn cmd_match_domain(email: &str, institution: &str, format: OutputFormat) -> anyhow::Result<bool> {
    let verdict = domain_match::matches(email, institution);

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({ "email": email, "institution": institution, "matches": verdict })
        ),
        OutputFormat::Pretty if verdict => {
            println!("{} {} belongs to {}", "MATCH".green().bold(), email, institution)
        }
        OutputFormat::Pretty => println!(
            "{} {} does not belong to {}",
            "NO MATCH".red().bold(),
            email,
            institution
        ),
    }

    Ok(verdict)
}
