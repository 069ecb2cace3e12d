// src/main.rs
use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use dotenvy::dotenv;
use sqlx::PgPool;
use std::env;
use std::sync::Arc;
use tokio::sync::watch;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use subgate::acquirer::AcquirerClient;
use subgate::config::Config;
use subgate::telegram::TelegramClient;
use subgate::tron::TronGridClient;
use subgate::{api, docs, scheduler, AppState};

async fn index() -> impl Responder {
    HttpResponse::Ok().body("Service ready!")
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Arc::new(Config::from_env());

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let acquirer = Arc::new(AcquirerClient::new(
        config.shop_id,
        &config.shop_secret,
        &config.acquiring_api_url,
        &config.callback_base_url,
    ));
    let chain = Arc::new(TronGridClient::new(
        &config.trongrid_api_key,
        &config.tron_node_url,
        &config.crypto_payment_address,
    ));
    let bot = Arc::new(TelegramClient::new(&config.bot_token));

    let state = AppState {
        pool,
        config,
        acquirer,
        chain,
        bot,
    };

    // Свип истёкших подписок живёт отдельно от HTTP и глушится по сигналу.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(scheduler::run_expiry_sweeper(state.clone(), shutdown_rx));

    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let data = web::Data::new(state);

    let result = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .route("/", web::get().to(index))
            .service(
                SwaggerUi::new("/docs/{_:.*}")
                    .url("/api-docs/openapi.json", docs::ApiDoc::openapi()),
            )
            // Вебхуки (публичные)
            .service(api::webhook::payment_webhook)
            .service(api::bot::bot_webhook)
            .service(
                web::scope("/api")
                    .service(api::payments::initiate_payment)
                    .service(api::payments::confirm_payment)
                    .service(api::payments::list_payments)
                    .service(api::payments::get_payment)
                    .service(api::users::list_users)
                    .service(api::users::get_user)
                    .service(api::stats::get_stats),
            )
    })
    .bind(bind_addr)?
    .run()
    .await;

    let _ = shutdown_tx.send(true);
    result
}
