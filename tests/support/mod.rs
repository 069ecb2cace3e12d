#![allow(dead_code)]

use async_trait::async_trait;
use sqlx::PgPool;
use std::env;
use std::sync::{Arc, Mutex as StdMutex, OnceLock};
use tokio::sync::{Mutex, MutexGuard};

use subgate::acquirer::{AcquirerApi, AcquirerError, AcquirerOrder};
use subgate::config::Config;
use subgate::models::PaymentMethod;
use subgate::telegram::{BotTransport, TelegramError};
use subgate::tron::ChainLedger;
use subgate::AppState;

fn split_db_url(url: &str) -> Result<(String, String), String> {
    let (base, query) = match url.split_once('?') {
        Some((base, query)) => (base.to_string(), Some(query)),
        None => (url.to_string(), None),
    };

    let db_start = base
        .rfind('/')
        .ok_or_else(|| "invalid database url".to_string())?;
    if db_start + 1 >= base.len() {
        return Err("database name is empty".to_string());
    }

    let db_name = base[db_start + 1..].to_string();
    let mut admin_url = format!("{}postgres", &base[..db_start + 1]);
    if let Some(query) = query {
        admin_url = format!("{admin_url}?{query}");
    }

    Ok((admin_url, db_name))
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

static TEST_DB_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

pub struct TestDb {
    pub pool: PgPool,
    _guard: MutexGuard<'static, ()>,
}

pub async fn init_test_db() -> TestDb {
    dotenvy::dotenv().ok();
    let test_url = env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
    let (admin_url, db_name) =
        split_db_url(&test_url).expect("invalid TEST_DATABASE_URL format");

    let lock = TEST_DB_LOCK.get_or_init(|| Mutex::new(()));
    let guard = lock.lock().await;

    let admin_pool = PgPool::connect(&admin_url)
        .await
        .expect("connect admin db");

    let _ = sqlx::query("SELECT pg_advisory_lock(424242)")
        .execute(&admin_pool)
        .await;

    let quoted_name = quote_identifier(&db_name);
    let drop_sql = format!("DROP DATABASE IF EXISTS {quoted_name} WITH (FORCE)");
    let create_sql = format!("CREATE DATABASE {quoted_name}");

    let _ = sqlx::query(&drop_sql).execute(&admin_pool).await;
    let create_result = sqlx::query(&create_sql).execute(&admin_pool).await;
    if let Err(e) = create_result {
        eprintln!("create test db error: {e}");
        let _ = sqlx::query(&drop_sql).execute(&admin_pool).await;
        sqlx::query(&create_sql)
            .execute(&admin_pool)
            .await
            .expect("create test db retry");
    }

    let _ = sqlx::query("SELECT pg_advisory_unlock(424242)")
        .execute(&admin_pool)
        .await;

    admin_pool.close().await;

    let pool = PgPool::connect(&test_url)
        .await
        .expect("connect test db");
    sqlx::migrate!().run(&pool).await.expect("migrations");
    TestDb { pool, _guard: guard }
}

/// Эквайринг-заглушка: отдаёт заранее заданный заказ, статус оплаты
/// переключается полем `paid`.
pub struct StubAcquirer {
    pub payment_url: String,
    pub external_id: Option<String>,
    pub paid: bool,
}

impl Default for StubAcquirer {
    fn default() -> Self {
        StubAcquirer {
            payment_url: "https://pay.example/checkout/1".to_string(),
            external_id: Some("ext-1".to_string()),
            paid: false,
        }
    }
}

#[async_trait]
impl AcquirerApi for StubAcquirer {
    async fn create_order(
        &self,
        _amount: f64,
        _payment_id: &str,
        _method: PaymentMethod,
        _user_id: i64,
    ) -> Result<AcquirerOrder, AcquirerError> {
        Ok(AcquirerOrder {
            payment_url: self.payment_url.clone(),
            external_id: self.external_id.clone(),
        })
    }

    async fn check_order(&self, _external_id: &str) -> bool {
        self.paid
    }
}

pub struct StubChain {
    pub found: bool,
}

#[async_trait]
impl ChainLedger for StubChain {
    async fn find_deposit(&self, _payment_id: &str, _expected_usdt: f64) -> bool {
        self.found
    }
}

/// Бот-заглушка: запоминает баны и сообщения, чтобы тесты могли их
/// проверить.
pub struct RecordingBot {
    pub approve_ok: bool,
    pub invite_link: Option<String>,
    pub messages: StdMutex<Vec<(i64, String)>>,
    pub bans: StdMutex<Vec<(i64, i64)>>,
}

impl Default for RecordingBot {
    fn default() -> Self {
        RecordingBot {
            approve_ok: true,
            invite_link: None,
            messages: StdMutex::new(Vec::new()),
            bans: StdMutex::new(Vec::new()),
        }
    }
}

impl RecordingBot {
    pub fn messages_to(&self, chat_id: i64) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == chat_id)
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn banned(&self, chat_id: i64, user_id: i64) -> bool {
        self.bans
            .lock()
            .unwrap()
            .iter()
            .any(|(c, u)| *c == chat_id && *u == user_id)
    }
}

#[async_trait]
impl BotTransport for RecordingBot {
    async fn approve_join_request(&self, _chat_id: i64, _user_id: i64) -> bool {
        self.approve_ok
    }

    async fn create_invite_link(
        &self,
        chat_id: i64,
        _expire_unixtime: i64,
    ) -> Result<String, TelegramError> {
        match &self.invite_link {
            Some(base) => Ok(format!("{base}/{chat_id}")),
            None => Err(TelegramError::InvalidResponse(
                "invite links disabled".to_string(),
            )),
        }
    }

    async fn ban_member(
        &self,
        chat_id: i64,
        user_id: i64,
        _until_unixtime: i64,
    ) -> Result<(), TelegramError> {
        self.bans.lock().unwrap().push((chat_id, user_id));
        Ok(())
    }

    async fn send_message(&self, chat_id: i64, text: &str) {
        self.messages
            .lock()
            .unwrap()
            .push((chat_id, text.to_string()));
    }
}

pub fn build_state(
    pool: PgPool,
    acquirer: Arc<StubAcquirer>,
    chain: Arc<StubChain>,
    bot: Arc<RecordingBot>,
) -> AppState {
    AppState {
        pool,
        config: Arc::new(Config::from_env()),
        acquirer,
        chain,
        bot,
    }
}
