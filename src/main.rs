//! SproutLog Server - Main entry point.
//!
//! Starts the Actix-web server with configured routes and middleware.

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{http::header, web, App, HttpServer};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use sproutlog_lib::api;
use sproutlog_lib::auth;
use sproutlog_lib::config::Config;
use sproutlog_lib::db::{self, DbPool};
use sproutlog_lib::middleware;
use sproutlog_lib::models::UserRole;
use sproutlog_lib::services::ai::AiProvider;
use sproutlog_lib::services::{self, Storage};

/// Seed the development admin profile if it does not exist yet.
fn seed_dev_admin(pool: &DbPool, email: &str, password: &str) {
    let existing = {
        let conn = pool.connection();
        db::profiles::find_by_email(&conn, email)
    };
    match existing {
        Ok(Some(_)) => {}
        Ok(None) => match auth::create_profile(pool, "Dev Admin", email, UserRole::Admin, password)
        {
            Ok(profile) => info!("Seeded development admin: {}", profile.email),
            Err(e) => error!("Failed to seed development admin: {}", e),
        },
        Err(e) => error!("Failed to look up development admin: {}", e),
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("");
            error!("Please check your environment variables:");
            error!("  - RUST_ENV must be set to 'development' or 'production'");
            error!("  - In production, DATABASE_URL and S3 credentials must be set");
            error!("  - In production, SPROUT_AI_PROVIDER=live requires the provider API keys");
            std::process::exit(1);
        }
    };

    info!("========================================");
    info!("  SproutLog Server");
    info!("  Environment: {}", config.environment);
    info!("========================================");

    if config.is_development() {
        warn!("Running in DEVELOPMENT mode - do not use in production!");
        info!("Using development defaults for DATABASE_URL and S3 credentials");
    }

    // Initialize database (synchronous)
    let pool = DbPool::new(&config.database_url).expect("Failed to initialize database");
    info!("Database connection established");

    // Run migrations (synchronous)
    db::migrations::run_migrations(&pool).expect("Failed to run migrations");
    info!("Database migrations complete");

    // Seed the development admin so a fresh checkout can log in immediately
    if let Some((email, password)) = &config.dev_admin {
        seed_dev_admin(&pool, email, password);
    }

    // Connect to object storage and make sure the media bucket exists
    let storage = Storage::new(&config.storage)
        .await
        .expect("Failed to initialize object storage");
    info!("Object storage ready (bucket: {})", config.storage.bucket);

    // Build the AI provider for the media-to-report pipeline
    let provider: Arc<dyn AiProvider> =
        services::ai::build_provider(&config.ai).expect("Failed to initialize AI provider");
    info!("AI provider: {}", config.ai.mode.as_str());

    // Prepare shared state
    let bind_address = config.bind_address();
    let max_upload_size = config.max_upload_size;
    let is_development = config.is_development();

    info!("Upload limit: {}MB per media file", max_upload_size / 1024 / 1024);

    let worker_count = if is_development {
        info!(
            "Starting server at http://{} (4 workers - development mode)",
            bind_address
        );
        4
    } else {
        let cpus = num_cpus::get();
        info!(
            "Starting server at http://{} ({} workers)",
            bind_address, cpus
        );
        cpus
    };

    // Start HTTP server
    let server = HttpServer::new(move || {
        // Configure CORS
        let cors = if is_development {
            // Permissive CORS for development
            Cors::default()
                .allowed_origin("http://localhost:3000")
                .allowed_origin("http://127.0.0.1:3000")
                .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
                .allowed_headers(vec![
                    header::AUTHORIZATION,
                    header::ACCEPT,
                    header::CONTENT_TYPE,
                    sproutlog_lib::config::SESSION_HEADER.parse().unwrap(),
                ])
                .max_age(3600)
        } else {
            // Restrictive CORS for production (same-origin only)
            Cors::default()
                .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
                .allowed_headers(vec![
                    header::AUTHORIZATION,
                    header::ACCEPT,
                    header::CONTENT_TYPE,
                    sproutlog_lib::config::SESSION_HEADER.parse().unwrap(),
                ])
                .max_age(3600)
        };

        App::new()
            // Add CORS middleware (must be before other middleware)
            .wrap(cors)
            // Add request logging middleware
            .wrap(middleware::RequestLogger)
            // Add shared state
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(storage.clone()))
            .app_data(web::Data::new(provider.clone()))
            .app_data(web::Data::new(config.clone()))
            // Allow some slack at the HTTP layer - the per-file limit is
            // enforced while reading the multipart stream
            .app_data(web::PayloadConfig::new(max_upload_size * 2))
            // Configure API routes
            .service(
                web::scope("/api/v1")
                    .configure(api::configure_health_routes)
                    .configure(api::configure_auth_routes)
                    .configure(api::configure_child_routes)
                    .configure(api::configure_profile_routes)
                    .configure(api::configure_media_routes)
                    .configure(api::configure_report_routes),
            )
            // Swagger UI with OpenAPI docs
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", api::ApiDoc::openapi()),
            )
    });

    // Set worker count
    server
        .workers(worker_count)
        .bind(&bind_address)?
        .run()
        .await
}
