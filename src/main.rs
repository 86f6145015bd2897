//! Campus Advisor - Main CLI Entry Point

use anyhow::Result;
use campus_advisor::config::Config;
use campus_advisor::orchestrator::Orchestrator;
use campus_advisor::session::FileSessionStore;
use campus_advisor::telemetry::TelemetryCollector;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io::{self, BufRead, Write};

/// Campus Advisor - multi-agent student advisor over your college catalog
#[derive(Parser, Debug)]
#[command(name = "campus-advisor")]
#[command(version)]
#[command(about = "Ask the multi-agent student advisor", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a single question
    Ask {
        /// Question text
        question: String,

        /// Session identifier (new session when omitted)
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Interactive conversation
    Chat {
        /// Session identifier (new session when omitted)
        #[arg(short, long)]
        session: Option<String>,
    },

    /// List stored sessions
    Sessions,

    /// Display current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load()?;

    match args.command {
        Commands::Ask { question, session } => {
            let telemetry = TelemetryCollector::new();
            let orchestrator = Orchestrator::from_config(&config, telemetry)?;
            let session_id = session.unwrap_or_else(new_session_id);

            let response = orchestrator.handle(&session_id, &question).await?;
            print_response(&session_id, &response);
        }

        Commands::Chat { session } => {
            let telemetry = TelemetryCollector::new();
            let orchestrator = Orchestrator::from_config(&config, telemetry.clone())?;
            let session_id = session.unwrap_or_else(new_session_id);

            println!(
                "{} session {} (type 'exit' to quit)\n",
                "Campus Advisor".bold(),
                session_id.cyan()
            );

            let stdin = io::stdin();
            loop {
                print!("{} ", "you>".green().bold());
                io::stdout().flush()?;

                let mut line = String::new();
                if stdin.lock().read_line(&mut line)? == 0 {
                    break;
                }
                let question = line.trim();
                if question.is_empty() {
                    continue;
                }
                if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
                    break;
                }

                match orchestrator.handle(&session_id, question).await {
                    Ok(response) => print_response(&session_id, &response),
                    Err(e) => eprintln!("{} {}", "error:".red().bold(), e),
                }
            }

            println!("\n{}", telemetry.summary().dimmed());
        }

        Commands::Sessions => {
            let store = FileSessionStore::new(config.session_storage_dir())?;
            let sessions = store.list_sessions()?;
            if sessions.is_empty() {
                println!("No stored sessions.");
            } else {
                for id in sessions {
                    println!("{}", id);
                }
            }
        }

        Commands::Config => {
            println!("Config file: {}", Config::config_path()?.display());
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn new_session_id() -> String {
    // Short ids keep session filenames and CLI usage friendly
    uuid::Uuid::new_v4().to_string()[..8].to_string()
}

fn print_response(
    session_id: &str,
    response: &campus_advisor::orchestrator::SynthesizedResponse,
) {
    println!("\n{}", response.answer);

    let mut meta = Vec::new();
    if !response.categories.is_empty() {
        let labels: Vec<&str> = response.categories.iter().map(|c| c.label()).collect();
        meta.push(format!("advisors: {}", labels.join(", ")));
    }
    if !response.partial_failures.is_empty() {
        let labels: Vec<&str> = response
            .partial_failures
            .iter()
            .map(|c| c.label())
            .collect();
        meta.push(format!("unavailable: {}", labels.join(", ")));
    }
    if !response.sources.is_empty() {
        meta.push(format!("sources: {}", response.sources.join("; ")));
    }
    meta.push(format!("session: {}", session_id));

    if response.failed {
        println!("\n{}", "all advisors were unavailable for this question".red());
    }
    println!("{}\n", meta.join(" | ").dimmed());
}
