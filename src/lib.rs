pub mod acquirer;
pub mod admission;
pub mod api;
pub mod billing;
pub mod config;
pub mod db;
pub mod docs;
pub mod error;
pub mod models;
pub mod scheduler;
pub mod telegram;
pub mod tron;

use std::sync::Arc;

use sqlx::PgPool;

use crate::acquirer::AcquirerApi;
use crate::config::Config;
use crate::telegram::BotTransport;
use crate::tron::ChainLedger;

/// Общее состояние процесса. Внешние системы (эквайринг, индексатор,
/// бот-транспорт) заходят через трейты: хендлеры и тесты получают их
/// готовыми, без глобальных синглтонов.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub acquirer: Arc<dyn AcquirerApi>,
    pub chain: Arc<dyn ChainLedger>,
    pub bot: Arc<dyn BotTransport>,
}
