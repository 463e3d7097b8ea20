//! List the Gemini models available to the configured API key.
//!
//! With `--probe`, send a tiny prompt to each candidate model and report the
//! first one that answers.

use clap::Parser;
use scheme_finder::config::Settings;
use scheme_finder::services::{GeminiClient, ServiceError};
use std::io::Write;
use std::process::ExitCode;

const PROBE_MODELS: [&str; 5] = [
    "gemini-1.5-flash",
    "gemini-2.0-flash",
    "gemini-1.5-pro",
    "gemini-1.0-pro",
    "gemini-2.0-flash-lite-preview-02-05",
];

#[derive(Debug, Parser)]
#[command(name = "check-models", about = "Check which Gemini models the API key can use")]
struct Args {
    /// Try generating with candidate models instead of only listing them
    #[arg(long)]
    probe: bool,

    /// Models to probe, in order (defaults to a built-in list)
    #[arg(long = "model", value_name = "MODEL")]
    models: Vec<String>,
}

fn describe(err: &ServiceError) -> String {
    match err {
        ServiceError::ApiError { status: 429, .. } => "quota/limit reached".to_string(),
        ServiceError::ApiError { status: 404, .. } => "not found".to_string(),
        other => other.to_string().lines().next().unwrap_or_default().to_string(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt().with_target(false).init();

    let args = Args::parse();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let Some(api_key) = settings.credentials.google_api_key.clone().filter(|k| !k.trim().is_empty()) else {
        eprintln!("GOOGLE_API_KEY is not set");
        return ExitCode::FAILURE;
    };

    let client = match GeminiClient::from_settings(&settings.gemini, api_key) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to create client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if !args.probe {
        println!("Checking available models for your API key...");
        return match client.list_models().await {
            Ok(models) => {
                println!("\nAvailable models:");
                for model in models.iter().filter(|m| m.supports("generateContent")) {
                    println!(" - {}", model.short_name());
                }
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("API error: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    let candidates: Vec<String> = if args.models.is_empty() {
        PROBE_MODELS.iter().map(|m| m.to_string()).collect()
    } else {
        args.models
    };

    for model in &candidates {
        print!("Testing: {} ... ", model);
        std::io::stdout().flush().ok();
        match client.generate_with_model(model, "Hi").await {
            Ok(_) => {
                println!("working");
                println!("\nUse this model: SCHEMES__GEMINI__GENERATION_MODEL={}", model);
                return ExitCode::SUCCESS;
            }
            Err(e) => println!("{}", describe(&e)),
        }
    }

    eprintln!("\nNo models worked. Check that the API key belongs to a project with the Generative Language API enabled.");
    ExitCode::FAILURE
}
