// src/tron.rs
//
// Проверка поступления USDT через индексатор TronGrid. Сканируем
// последние входящие TRC-20 переводы на депозитный адрес и ищем
// перевод с ID платежа в комментарии. Это эвристика: не успевший
// проиндексироваться платёж — нормальный случай, пользователь
// перепроверяет позже.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use serde::Deserialize;
use std::time::Duration;

/// Контракт USDT в сети TRON.
const USDT_CONTRACT: &str = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";

/// Допуск по сумме: засчитываем от 99% ожидаемого.
pub const AMOUNT_TOLERANCE: f64 = 0.01;

/// Глубина просмотра: сутки, не более 20 переводов.
const LOOKBACK_HOURS: i64 = 24;
const SCAN_LIMIT: u32 = 20;

#[derive(Debug, Clone, Deserialize)]
pub struct TokenInfo {
    pub symbol: String,
    #[serde(default = "default_decimals")]
    pub decimals: u32,
}

fn default_decimals() -> u32 {
    6
}

#[derive(Debug, Clone, Deserialize)]
pub struct Trc20Transfer {
    #[serde(default)]
    pub transaction_id: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub value: String,
    pub token_info: Option<TokenInfo>,
    /// Индексатор может не прислать поле — тогда считаем подтверждённым,
    /// как и при фильтре only_confirmed.
    #[serde(default = "default_confirmed")]
    pub confirmed: bool,
    #[serde(default)]
    pub data: String,
}

fn default_confirmed() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct Trc20Page {
    #[serde(default)]
    data: Vec<Trc20Transfer>,
}

/// Перевод засчитывается, когда выполнено всё сразу: входящий на
/// депозитный адрес, токен USDT, подтверждён, сумма не меньше
/// ожидаемой с допуском, и ID платежа встречается в данных перевода.
pub fn deposit_matches(
    tx: &Trc20Transfer,
    deposit_address: &str,
    expected_usdt: f64,
    payment_id: &str,
) -> bool {
    let is_incoming = tx.to.eq_ignore_ascii_case(deposit_address);

    let (is_usdt, decimals) = match &tx.token_info {
        Some(info) => (info.symbol == "USDT", info.decimals),
        None => return false,
    };

    let received = match tx.value.parse::<f64>() {
        Ok(v) => v / 10f64.powi(decimals as i32),
        Err(_) => return false,
    };
    let amount_match = received >= expected_usdt * (1.0 - AMOUNT_TOLERANCE);

    let memo = format!("{}{}", tx.transaction_id, tx.data);
    let has_payment_id = memo.contains(payment_id);

    is_incoming && is_usdt && tx.confirmed && amount_match && has_payment_id
}

#[async_trait]
pub trait ChainLedger: Send + Sync {
    /// true, если среди недавних переводов найден подходящий депозит.
    /// Ошибки индексатора — «не найден»: подтверждать по умолчанию нельзя.
    async fn find_deposit(&self, payment_id: &str, expected_usdt: f64) -> bool;
}

#[derive(Clone)]
pub struct TronGridClient {
    api_key: String,
    node_url: String,
    deposit_address: String,
}

impl TronGridClient {
    pub fn new(api_key: &str, node_url: &str, deposit_address: &str) -> Self {
        TronGridClient {
            api_key: api_key.to_string(),
            node_url: node_url.trim_end_matches('/').to_string(),
            deposit_address: deposit_address.to_string(),
        }
    }
}

#[async_trait]
impl ChainLedger for TronGridClient {
    async fn find_deposit(&self, payment_id: &str, expected_usdt: f64) -> bool {
        let min_timestamp = (Utc::now() - ChronoDuration::hours(LOOKBACK_HOURS)).timestamp_millis();
        let url = format!(
            "{}/v1/accounts/{}/transactions/trc20",
            self.node_url, self.deposit_address
        );

        let resp = reqwest::Client::new()
            .get(&url)
            .header("TRON-PRO-API-KEY", &self.api_key)
            .timeout(Duration::from_secs(10))
            .query(&[
                ("contract_address", USDT_CONTRACT.to_string()),
                ("only_confirmed", "true".to_string()),
                ("limit", SCAN_LIMIT.to_string()),
                ("order_by", "block_timestamp,desc".to_string()),
                ("min_timestamp", min_timestamp.to_string()),
            ])
            .send()
            .await;

        let resp = match resp {
            Ok(r) => r,
            Err(e) => {
                log::error!("ошибка запроса к TronGrid: {e}");
                return false;
            }
        };

        if !resp.status().is_success() {
            log::error!("TronGrid API error: {}", resp.status());
            return false;
        }

        let page: Trc20Page = match resp.json().await {
            Ok(p) => p,
            Err(e) => {
                log::error!("ошибка разбора ответа TronGrid: {e}");
                return false;
            }
        };

        for tx in &page.data {
            if deposit_matches(tx, &self.deposit_address, expected_usdt, payment_id) {
                log::info!("найден подходящий платёж: {}", tx.transaction_id);
                return true;
            }
        }

        false
    }
}
