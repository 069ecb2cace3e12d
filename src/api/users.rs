// src/api/users.rs

use actix_web::{get, web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;
use utoipa::IntoParams;

use crate::{db, AppState};

#[derive(Debug, Deserialize, IntoParams)]
pub struct UsersQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "users",
    params(UsersQuery),
    responses((status = 200, description = "Users page"))
)]
#[get("/users")]
pub async fn list_users(
    state: web::Data<AppState>,
    query: web::Query<UsersQuery>,
) -> impl Responder {
    let limit = query.limit.unwrap_or(50);
    let offset = query.offset.unwrap_or(0);

    if !(1..=100).contains(&limit) || offset < 0 {
        return HttpResponse::BadRequest()
            .json(json!({"error": "limit must be 1..100, offset must be >= 0"}));
    }

    let total = match db::count_users(&state.pool).await {
        Ok(n) => n,
        Err(e) => {
            log::error!("count_users error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    match db::list_users(&state.pool, limit, offset).await {
        Ok(users) => HttpResponse::Ok().json(json!({
            "total": total,
            "limit": limit,
            "offset": offset,
            "users": users,
        })),
        Err(e) => {
            log::error!("list_users error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/users/{user_id}",
    tag = "users",
    params(("user_id" = i64, Path, description = "ID пользователя в боте")),
    responses(
        (status = 200, description = "User with activity counts"),
        (status = 404, description = "User not found")
    )
)]
#[get("/users/{user_id}")]
pub async fn get_user(state: web::Data<AppState>, path: web::Path<i64>) -> impl Responder {
    let user_id = path.into_inner();

    let user = match db::get_user(&state.pool, user_id).await {
        Ok(Some(u)) => u,
        Ok(None) => return HttpResponse::NotFound().json(json!({"error": "User not found"})),
        Err(e) => {
            log::error!("get_user error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let (payments, subscriptions) = match db::user_activity_counts(&state.pool, user_id).await {
        Ok(counts) => counts,
        Err(e) => {
            log::error!("user_activity_counts error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    HttpResponse::Ok().json(json!({
        "user_id": user.user_id,
        "username": user.username,
        "registration_date": user.registration_date,
        "last_activity": user.last_activity,
        "stats": {
            "payments": payments,
            "subscriptions": subscriptions,
        }
    }))
}
