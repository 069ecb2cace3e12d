// src/api/stats.rs

use actix_web::{get, web, HttpResponse, Responder};
use serde_json::json;

use crate::models::PaymentStatus;
use crate::{db, AppState};

#[utoipa::path(
    get,
    path = "/api/stats",
    tag = "stats",
    responses((status = 200, description = "Aggregate counters"))
)]
#[get("/stats")]
pub async fn get_stats(state: web::Data<AppState>) -> impl Responder {
    let pool = &state.pool;

    let result: Result<_, sqlx::Error> = async {
        let total_users = db::count_users(pool).await?;
        let total_payments = db::count_payments(pool, None).await?;
        let completed_payments =
            db::count_payments(pool, Some(PaymentStatus::Completed)).await?;
        let total_revenue = db::sum_completed_amount(pool).await?;
        let active_subscriptions = db::count_active_subscriptions(pool).await?;
        Ok((
            total_users,
            total_payments,
            completed_payments,
            total_revenue,
            active_subscriptions,
        ))
    }
    .await;

    match result {
        Ok((users, payments, completed, revenue, active)) => HttpResponse::Ok().json(json!({
            "users": { "total": users },
            "payments": {
                "total": payments,
                "completed": completed,
                "pending": payments - completed,
            },
            "revenue": { "total": revenue, "currency": "RUB" },
            "subscriptions": { "active": active },
        })),
        Err(e) => {
            log::error!("stats error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}
