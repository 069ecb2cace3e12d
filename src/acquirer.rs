// src/acquirer.rs
//
// Клиент эквайринга (карта/СБП). Двухшаговый протокол:
// создание заказа с подписью + проверка статуса по внешнему ID.
// Подпись — md5 hex от компонентов, склеенных двоеточием; порядок
// и регистр полей менять нельзя, иначе провайдер отвергнет запрос.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

use crate::models::PaymentMethod;

#[derive(Debug)]
pub enum AcquirerError {
    Http(reqwest::Error),
    Api { status: u16, body: String },
    Rejected(String),
    InvalidResponse(String),
}

impl fmt::Display for AcquirerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquirerError::Http(e) => write!(f, "http error: {e}"),
            AcquirerError::Api { status, body } => {
                write!(f, "acquirer api error status={status} body={body}")
            }
            AcquirerError::Rejected(msg) => write!(f, "заказ отклонён: {msg}"),
            AcquirerError::InvalidResponse(e) => write!(f, "invalid response: {e}"),
        }
    }
}

impl From<reqwest::Error> for AcquirerError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}

/// Созданный в эквайринге заказ.
#[derive(Debug, Clone)]
pub struct AcquirerOrder {
    pub payment_url: String,
    pub external_id: Option<String>,
}

#[async_trait]
pub trait AcquirerApi: Send + Sync {
    async fn create_order(
        &self,
        amount: f64,
        payment_id: &str,
        method: PaymentMethod,
        user_id: i64,
    ) -> Result<AcquirerOrder, AcquirerError>;

    /// Проверка статуса. Любая ошибка транспорта или разбора — «не оплачен»:
    /// подтверждение выводится только из явного успешного ответа.
    async fn check_order(&self, external_id: &str) -> bool;
}

/// Сумма в подписи форматируется как десятичное число с дробной частью,
/// даже целое: 1900 → "1900.0". Так её видит провайдер.
pub fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{amount:.1}")
    } else {
        amount.to_string()
    }
}

/// Подпись создания заказа: md5("{shop_id}:{secret}:{amount}:{payment_id}").
pub fn sign_order(shop_id: i64, secret: &str, amount: f64, payment_id: &str) -> String {
    let raw = format!("{shop_id}:{secret}:{}:{payment_id}", format_amount(amount));
    format!("{:x}", md5::compute(raw.as_bytes()))
}

/// Подпись проверки статуса: md5("{shop_id}:{secret}:{external_id}").
pub fn sign_status(shop_id: i64, secret: &str, external_id: &str) -> String {
    let raw = format!("{shop_id}:{secret}:{external_id}");
    format!("{:x}", md5::compute(raw.as_bytes()))
}

/// Ответ статуса считается оплаченным только по явному признаку:
/// числовой код 1, paid=true либо строковый статус success/paid/completed.
pub fn is_paid_response(data: &Value) -> bool {
    if data.get("status").and_then(Value::as_i64) == Some(1) {
        return true;
    }
    if data.get("paid").and_then(Value::as_bool) == Some(true) {
        return true;
    }
    for field in ["status", "state"] {
        if let Some(s) = data.get(field).and_then(Value::as_str) {
            if matches!(s, "success" | "paid" | "completed") {
                return true;
            }
        }
    }
    false
}

#[derive(Debug, Serialize)]
struct CreateOrderRequest {
    shop_id: String,
    amount: f64,
    merchant_order_id: String,
    sign: String,
    method: String,
    user_id: String,
    callback_url: String,
    description: String,
}

#[derive(Clone)]
pub struct AcquirerClient {
    shop_id: i64,
    shop_secret: String,
    api_url: String,
    callback_base_url: String,
}

impl AcquirerClient {
    pub fn new(shop_id: i64, shop_secret: &str, api_url: &str, callback_base_url: &str) -> Self {
        AcquirerClient {
            shop_id,
            shop_secret: shop_secret.to_string(),
            api_url: api_url.trim_end_matches('/').to_string(),
            callback_base_url: callback_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl AcquirerApi for AcquirerClient {
    async fn create_order(
        &self,
        amount: f64,
        payment_id: &str,
        method: PaymentMethod,
        user_id: i64,
    ) -> Result<AcquirerOrder, AcquirerError> {
        let request = CreateOrderRequest {
            shop_id: self.shop_id.to_string(),
            amount,
            merchant_order_id: payment_id.to_string(),
            sign: sign_order(self.shop_id, &self.shop_secret, amount, payment_id),
            method: method.as_str().to_string(),
            user_id: user_id.to_string(),
            callback_url: format!("{}/callback/{payment_id}", self.callback_base_url),
            description: format!("Оплата подписки (ID: {payment_id})"),
        };

        log::info!("создание платежа в эквайринге: {payment_id}");

        let resp = reqwest::Client::new()
            .post(format!("{}/api/merchant/order/create/by-api", self.api_url))
            .header("Accept", "application/json")
            .header("X-Request-ID", Uuid::new_v4().to_string())
            .timeout(Duration::from_secs(30))
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(AcquirerError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let data: Value = serde_json::from_str(&body)
            .map_err(|e| AcquirerError::InvalidResponse(format!("{e}; body={body}")))?;

        if data.get("success").and_then(Value::as_bool) != Some(true) {
            let msg = data
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Неизвестная ошибка API")
                .to_string();
            return Err(AcquirerError::Rejected(msg));
        }

        let payment_url = data
            .get("url")
            .or_else(|| data.get("payment_url"))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                AcquirerError::InvalidResponse("не получен URL для оплаты".to_string())
            })?
            .to_string();

        let external_id = ["payment_id", "external_id", "id"]
            .iter()
            .find_map(|k| data.get(*k).and_then(Value::as_str))
            .map(|s| s.to_string());

        Ok(AcquirerOrder {
            payment_url,
            external_id,
        })
    }

    async fn check_order(&self, external_id: &str) -> bool {
        let sign = sign_status(self.shop_id, &self.shop_secret, external_id);

        let resp = reqwest::Client::new()
            .get(format!("{}/api/check/{external_id}", self.api_url))
            .header("Accept", "application/json")
            .header("x-sign", sign)
            .header("X-Request-ID", Uuid::new_v4().to_string())
            .timeout(Duration::from_secs(15))
            .send()
            .await;

        let resp = match resp {
            Ok(r) => r,
            Err(e) => {
                log::error!("ошибка проверки платежа {external_id}: {e}");
                return false;
            }
        };

        if !resp.status().is_success() {
            log::error!(
                "ошибка проверки платежа {external_id}: status={}",
                resp.status()
            );
            return false;
        }

        let data: Value = match resp.json().await {
            Ok(d) => d,
            Err(e) => {
                log::error!("ошибка разбора ответа по платежу {external_id}: {e}");
                return false;
            }
        };

        if is_paid_response(&data) {
            log::info!("платёж {external_id} подтверждён");
            return true;
        }

        false
    }
}
