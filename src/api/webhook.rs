// src/api/webhook.rs
//
// Callback платёжной системы о статусе заказа. Успех и отказ идут
// через оркестратор тем же идемпотентным путём, что и ручная проверка.

use actix_web::{post, web, HttpResponse};
use serde::Deserialize;
use serde_json::{json, Value};
use utoipa::ToSchema;

use crate::billing::{self, ConfirmOutcome};
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct PaymentWebhook {
    /// Наш внутренний ID платежа.
    pub merchant_order_id: Option<String>,

    /// ID платежа на стороне провайдера.
    #[serde(alias = "id")]
    pub payment_id: Option<String>,

    /// Число (1/2) или строка — провайдеры шлют по-разному.
    #[schema(value_type = Object)]
    pub status: Option<Value>,

    /// Подпись провайдера. Принимается, но не сверяется — известный
    /// пробел этой интеграции.
    #[serde(default)]
    #[allow(dead_code)]
    pub sign: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum WebhookStatus {
    Success,
    Failed,
    Unknown,
}

/// Нормализация статуса провайдера: 1/success/completed — успех,
/// 2/failed/error — отказ, всё прочее не меняет состояния.
pub fn classify_status(status: &Value) -> WebhookStatus {
    if let Some(n) = status.as_i64() {
        return match n {
            1 => WebhookStatus::Success,
            2 => WebhookStatus::Failed,
            _ => WebhookStatus::Unknown,
        };
    }

    match status.as_str() {
        Some("success") | Some("completed") => WebhookStatus::Success,
        Some("failed") | Some("error") => WebhookStatus::Failed,
        _ => WebhookStatus::Unknown,
    }
}

#[utoipa::path(
    post,
    path = "/webhook/payment",
    tag = "webhooks",
    request_body = PaymentWebhook,
    responses(
        (status = 200, description = "Payload accepted"),
        (status = 400, description = "Missing required fields"),
        (status = 500, description = "Server error")
    )
)]
#[post("/webhook/payment")]
pub async fn payment_webhook(
    payload: web::Json<PaymentWebhook>,
    state: web::Data<AppState>,
) -> HttpResponse {
    let payload = payload.into_inner();

    let (Some(payment_id), Some(external_id), Some(status)) = (
        payload.merchant_order_id,
        payload.payment_id,
        payload.status,
    ) else {
        return HttpResponse::BadRequest().json(json!({"error": "Missing required fields"}));
    };

    match classify_status(&status) {
        WebhookStatus::Success => {
            match billing::apply_external_status(state.get_ref(), &payment_id, &external_id, true)
                .await
            {
                Ok(ConfirmOutcome::NotFound) => {
                    // Неизвестный заказ подтверждаем, чтобы провайдер не ретраил.
                    log::warn!("webhook: платёж {payment_id} не найден");
                    HttpResponse::Ok().json(json!({"status": "ok", "message": "Unknown payment"}))
                }
                Ok(_) => {
                    log::info!("webhook: платёж {payment_id} успешно обработан");
                    HttpResponse::Ok().json(json!({"status": "ok", "message": "Payment processed"}))
                }
                Err(e) => {
                    log::error!("ошибка обработки webhook для {payment_id}: {e}");
                    HttpResponse::InternalServerError().finish()
                }
            }
        }
        WebhookStatus::Failed => {
            match billing::apply_external_status(state.get_ref(), &payment_id, &external_id, false)
                .await
            {
                Ok(ConfirmOutcome::MarkedFailed) => {
                    log::warn!("webhook: платёж {payment_id} отклонён");
                    HttpResponse::Ok().json(json!({"status": "ok", "message": "Payment failed"}))
                }
                // Статус уже терминальный — подтверждаем без изменений.
                Ok(_) => HttpResponse::Ok()
                    .json(json!({"status": "ok", "message": "Payment already settled"})),
                Err(e) => {
                    log::error!("ошибка обработки webhook для {payment_id}: {e}");
                    HttpResponse::InternalServerError().finish()
                }
            }
        }
        WebhookStatus::Unknown => {
            log::warn!("webhook: неизвестный статус {status} для платежа {payment_id}");
            HttpResponse::Ok().json(json!({"status": "ok", "message": "Unknown status"}))
        }
    }
}
