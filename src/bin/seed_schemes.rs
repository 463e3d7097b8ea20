//! Embed a list of schemes and insert them into the datastore.
//!
//! Usage: seed-schemes [--file schemes.json] [--dry-run]

use clap::Parser;
use scheme_finder::config::Settings;
use scheme_finder::seed::{default_schemes, load_schemes, seed_schemes};
use scheme_finder::services::{GeminiClient, SupabaseClient};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "seed-schemes", about = "Embed and insert welfare schemes")]
struct Args {
    /// JSON array of {title, description, category}; defaults to the built-in set
    #[arg(long)]
    file: Option<PathBuf>,

    /// Print what would be embedded without calling any service
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt().with_target(false).init();

    let args = Args::parse();

    let schemes = match &args.file {
        Some(path) => match load_schemes(path) {
            Ok(schemes) => schemes,
            Err(e) => {
                error!("{}", e);
                return ExitCode::FAILURE;
            }
        },
        None => default_schemes(),
    };

    if args.dry_run {
        for scheme in &schemes {
            info!("Would embed: {}", scheme.embedding_text());
        }
        return ExitCode::SUCCESS;
    }

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let credentials = match settings.credentials.require() {
        Ok(credentials) => credentials,
        Err(missing) => {
            error!("{}", missing);
            return ExitCode::FAILURE;
        }
    };

    let clients = GeminiClient::from_settings(&settings.gemini, credentials.google_api_key).and_then(|gemini| {
        SupabaseClient::from_settings(
            &settings.supabase,
            credentials.supabase_url,
            credentials.supabase_service_key,
        )
        .map(|supabase| (gemini, supabase))
    });
    let (gemini, supabase) = match clients {
        Ok(clients) => clients,
        Err(e) => {
            error!("Failed to create clients: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Starting seed of {} schemes...", schemes.len());

    match seed_schemes(&gemini, &supabase, &schemes).await {
        Ok(report) if report.failed.is_empty() => {
            info!("Seeding complete: {} inserted", report.inserted);
            ExitCode::SUCCESS
        }
        Ok(report) => {
            error!(
                "Seeding finished with errors: {} inserted, failed: {}",
                report.inserted,
                report.failed.join(", ")
            );
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("Seeding aborted: {}", e);
            ExitCode::FAILURE
        }
    }
}
