use actix_cors::Cors;
use actix_web::{web, App, HttpServer, middleware};
use scheme_finder::config::{LoggingSettings, Settings};
use scheme_finder::routes::{self, AppState};
use tracing::{info, error, warn};
use tracing_subscriber::EnvFilter;

/// Initialize logging; `RUST_LOG` takes precedence over the configured level
fn init_logging(logging: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            init_logging(&LoggingSettings::default());
            error!("Failed to load configuration: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e));
        }
    };

    init_logging(&settings.logging);

    info!("Starting Scheme Finder service...");

    let app_state = AppState::from_settings(&settings).map_err(|e| {
        error!("Failed to initialize service clients: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e)
    })?;

    match app_state.pipeline() {
        Ok(pipeline) => {
            let search = pipeline.search_params();
            info!(
                "Pipeline ready (embedding: {}, generation: {}, threshold: {}, count: {})",
                settings.gemini.embedding_model,
                settings.gemini.generation_model,
                search.threshold,
                search.match_count
            );
        }
        Err(e) => warn!("{}; /api/benefits will answer with a configuration error", e),
    }

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(routes::json_config())
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
