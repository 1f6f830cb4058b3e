mod analysis;
mod auth;
mod chat;
mod config;
mod db;
mod error;
mod llm;
mod routes;
mod storage;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{App, HttpServer, web};
use analysis::Analyzer;
use analysis::config::AnalysisConfig;
use auth::jwt::JwtService;
use auth::middleware::AuthMiddleware;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use aws_sdk_s3::Client as S3Client;
use chat::ChatService;
use config::AppConfig;
use db::ChatStore;
use db::dynamodb_repository::DynamoDbChatStore;
use db::memory_repository::InMemoryChatStore;
use llm::client::LlmClient;
use routes::configure_routes;
use std::env;
use std::sync::Arc;
use storage::S3Service;

fn startup_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    log::error!("{}: {}", context, err);
    std::io::Error::other(format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    }

    let app_config =
        AppConfig::from_env().map_err(|e| startup_error("Configuration error", e))?;
    let analysis_config = AnalysisConfig::load(app_config.analysis_config_path.as_deref())
        .map_err(|e| startup_error("Analysis configuration error", e))?;
    log::info!(
        "Analysis pipeline v{}: canvas {:?}, threshold ratio {}",
        analysis_config.version,
        analysis_config.image.size,
        analysis_config.stress.threshold_ratio
    );

    let llm_client =
        LlmClient::new(&app_config.llm).map_err(|e| startup_error("LLM client error", e))?;
    log::info!("LLM model: {}", llm_client.model());

    let needs_aws = app_config.chats_table.is_some() || app_config.s3_bucket.is_some();
    let aws_config = if needs_aws {
        Some(aws_config::defaults(BehaviorVersion::latest()).load().await)
    } else {
        None
    };

    let chat_store: Arc<dyn ChatStore> = match (&app_config.chats_table, &aws_config) {
        (Some(table), Some(aws_config)) => {
            let store = DynamoDbChatStore::new(DynamoDbClient::new(aws_config), table.clone());
            store
                .verify_table()
                .await
                .map_err(|e| startup_error("Chat table check failed", e))?;
            log::info!("Chat store: DynamoDB table '{}'", table);
            Arc::new(store)
        }
        _ => {
            log::warn!("DYNAMODB_CHATS_TABLE not set; chats are kept in memory and lost on restart");
            Arc::new(InMemoryChatStore::new())
        }
    };

    let s3_service = match (&app_config.s3_bucket, &aws_config) {
        (Some(bucket), Some(aws_config)) => {
            log::info!("Image storage: S3 bucket '{}'", bucket);
            Some(web::Data::new(S3Service::new(S3Client::new(aws_config), bucket.clone())))
        }
        _ => {
            log::info!("Image storage disabled");
            None
        }
    };

    let analyzer = web::Data::new(Analyzer::new(analysis_config));
    let chat_service = web::Data::new(ChatService::new(chat_store, llm_client));
    let jwt_service = JwtService::new(&app_config.jwt_secret, &app_config.jwt_audience);

    let bind_address = app_config.bind_address();
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        let mut app = App::new()
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::AUTHORIZATION,
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(analyzer.clone())
            .app_data(chat_service.clone());
        if let Some(s3_service) = &s3_service {
            app = app.app_data(s3_service.clone());
        }
        let auth_middleware = AuthMiddleware::new(jwt_service.clone());
        app.configure(|cfg| configure_routes(cfg, auth_middleware))
    })
    .bind(&bind_address)?
    .run()
    .await?;

    log::info!("Server stopped");
    Ok(())
}
