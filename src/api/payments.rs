// src/api/payments.rs
//
// Операционные ручки для бот-фронта (создание и проверка платежа)
// и read-only список платежей для аналитики.

use actix_web::{get, post, web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

use crate::billing::{self, ConfirmOutcome, InitiateOutcome};
use crate::error::BillingError;
use crate::models::{PaymentMethod, PaymentStatus};
use crate::{admission, db, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct InitiateRequest {
    pub user_id: i64,
    pub username: Option<String>,
    /// Ключ тарифа (basic_1, vip_2, all, ...).
    pub tariff_id: String,
    /// "30_days" либо "forever".
    pub duration: String,
    /// card / sbp / usdt.
    pub method: String,
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[utoipa::path(
    post,
    path = "/api/payments/initiate",
    tag = "payments",
    request_body = InitiateRequest,
    responses(
        (status = 200, description = "Payment created"),
        (status = 400, description = "Unknown tariff, duration or method"),
        (status = 502, description = "Acquirer rejected the order")
    )
)]
#[post("/payments/initiate")]
pub async fn initiate_payment(
    state: web::Data<AppState>,
    payload: web::Json<InitiateRequest>,
) -> impl Responder {
    let payload = payload.into_inner();

    let Some(method) = PaymentMethod::parse(&payload.method) else {
        return HttpResponse::BadRequest()
            .json(json!({"error": format!("Invalid method: {}", payload.method)}));
    };

    let outcome = billing::initiate_payment(
        state.get_ref(),
        payload.user_id,
        payload.username.as_deref().unwrap_or(""),
        &payload.tariff_id,
        &payload.duration,
        method,
    )
    .await;

    match outcome {
        Ok(InitiateOutcome::Checkout {
            payment_id,
            payment_url,
            amount,
            tariff_label,
        }) => HttpResponse::Ok().json(json!({
            "payment_id": payment_id,
            "method": method,
            "payment_url": payment_url,
            "amount": amount,
            "tariff": tariff_label,
        })),
        Ok(InitiateOutcome::CryptoDeposit {
            payment_id,
            address,
            network,
            amount_usdt,
            amount,
            tariff_label,
        }) => HttpResponse::Ok().json(json!({
            "payment_id": payment_id,
            "method": method,
            "address": address,
            "network": network,
            "amount_usdt": round2(amount_usdt),
            "amount": amount,
            "tariff": tariff_label,
        })),
        Err(BillingError::InvalidTariff) => HttpResponse::BadRequest()
            .json(json!({"error": "Тариф не найден или неверный срок подписки"})),
        Err(BillingError::DuplicateKey) => HttpResponse::Conflict()
            .json(json!({"error": "Платёж уже создан, проверьте его статус"})),
        Err(BillingError::Provider(msg)) => {
            log::error!("эквайринг отклонил заказ: {msg}");
            HttpResponse::BadGateway()
                .json(json!({"error": "Ошибка платёжной системы", "details": msg}))
        }
        Err(e) => {
            log::error!("ошибка создания платежа: {e}");
            HttpResponse::InternalServerError()
                .json(json!({"error": "Ошибка при создании платежа. Попробуйте позже"}))
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/payments/{payment_id}/confirm",
    tag = "payments",
    params(("payment_id" = String, Path, description = "Внутренний ID платежа")),
    responses(
        (status = 200, description = "Check result"),
        (status = 404, description = "Payment not found")
    )
)]
#[post("/payments/{payment_id}/confirm")]
pub async fn confirm_payment(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    let payment_id = path.into_inner();

    match billing::confirm_payment(state.get_ref(), &payment_id).await {
        Ok(ConfirmOutcome::Activated {
            subscription,
            report,
        }) => HttpResponse::Ok().json(json!({
            "status": "activated",
            "valid": admission::validity_wording(&subscription.tariff),
            "subscription": subscription,
            "report": report.render(),
        })),
        Ok(ConfirmOutcome::AlreadyActive) => HttpResponse::Ok().json(json!({
            "status": "already_active",
            "message": "Подписка уже активирована",
        })),
        Ok(ConfirmOutcome::NotConfirmed) => HttpResponse::Ok().json(json!({
            "status": "not_confirmed",
            "message": "Оплата не найдена. Если вы уже оплатили, подождите несколько минут и попробуйте снова.",
        })),
        Ok(ConfirmOutcome::MarkedFailed) => HttpResponse::Ok().json(json!({
            "status": "failed",
            "message": "Платёж отклонён платёжной системой",
        })),
        Ok(ConfirmOutcome::Unchanged) => HttpResponse::Ok().json(json!({
            "status": "unchanged",
            "message": "Платёж уже завершён, статус не изменился",
        })),
        Ok(ConfirmOutcome::NotFound) => {
            HttpResponse::NotFound().json(json!({"error": "Payment not found"}))
        }
        Err(e) => {
            // Состояние не тронуто, операцию можно безопасно повторить.
            log::error!("ошибка в confirm_payment для {payment_id}: {e}");
            HttpResponse::InternalServerError()
                .json(json!({"error": "Произошла ошибка при проверке платежа. Попробуйте позже"}))
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct PaymentsQuery {
    /// Фильтр по статусу (pending/completed/failed/cancelled).
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/payments",
    tag = "payments",
    params(PaymentsQuery),
    responses((status = 200, description = "Payments page"))
)]
#[get("/payments")]
pub async fn list_payments(
    state: web::Data<AppState>,
    query: web::Query<PaymentsQuery>,
) -> impl Responder {
    let limit = query.limit.unwrap_or(50);
    let offset = query.offset.unwrap_or(0);

    if !(1..=100).contains(&limit) || offset < 0 {
        return HttpResponse::BadRequest()
            .json(json!({"error": "limit must be 1..100, offset must be >= 0"}));
    }

    let status = match query.status.as_deref() {
        None => None,
        Some(raw) => match PaymentStatus::parse(raw) {
            Some(s) => Some(s),
            None => {
                return HttpResponse::BadRequest()
                    .json(json!({"error": format!("Invalid status: {raw}")}));
            }
        },
    };

    let total = match db::count_payments(&state.pool, status).await {
        Ok(n) => n,
        Err(e) => {
            log::error!("count_payments error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    match db::list_payments(&state.pool, status, limit, offset).await {
        Ok(payments) => HttpResponse::Ok().json(json!({
            "total": total,
            "limit": limit,
            "offset": offset,
            "payments": payments,
        })),
        Err(e) => {
            log::error!("list_payments error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/payments/{payment_id}",
    tag = "payments",
    params(("payment_id" = String, Path, description = "Внутренний ID платежа")),
    responses(
        (status = 200, description = "Payment"),
        (status = 404, description = "Payment not found")
    )
)]
#[get("/payments/{payment_id}")]
pub async fn get_payment(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let payment_id = path.into_inner();

    let payment = match db::get_payment(&state.pool, &payment_id).await {
        Ok(Some(p)) => p,
        Ok(None) => return HttpResponse::NotFound().json(json!({"error": "Payment not found"})),
        Err(e) => {
            log::error!("get_payment error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let username = match db::get_user(&state.pool, payment.user_id).await {
        Ok(Some(u)) => Some(u.username),
        _ => None,
    };

    HttpResponse::Ok().json(json!({
        "payment_id": payment.payment_id,
        "user_id": payment.user_id,
        "username": username,
        "tariff": payment.tariff,
        "amount": payment.amount,
        "status": payment.status,
        "method": payment.method,
        "payment_date": payment.payment_date,
        "updated_at": payment.updated_at,
        "external_id": payment.external_id,
    }))
}
