// src/db.rs
//
// Хранилище пользователей, платежей, подписок и инвайтов.
// Весь SQL живёт здесь; модели наружу отдаются уже собранными.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgExecutor, PgPool, Row};

use crate::models::{
    Invite, Payment, PaymentMethod, PaymentStatus, Subscription, SubscriptionStatus, User,
};

fn row_to_user(r: &PgRow) -> User {
    User {
        user_id: r.get("user_id"),
        username: r.get("username"),
        registration_date: r.get("registration_date"),
        last_activity: r.get("last_activity"),
    }
}

fn row_to_payment(r: &PgRow) -> Payment {
    let status: String = r.get("status");
    let method: String = r.get("method");
    Payment {
        user_id: r.get("user_id"),
        payment_id: r.get("payment_id"),
        external_id: r.get("external_id"),
        tariff: r.get("tariff"),
        amount: r.get("amount"),
        status: PaymentStatus::parse(&status).unwrap_or(PaymentStatus::Pending),
        method: PaymentMethod::parse(&method).unwrap_or(PaymentMethod::Card),
        payment_date: r.get("payment_date"),
        updated_at: r.get("updated_at"),
    }
}

fn row_to_subscription(r: &PgRow) -> Subscription {
    let status: String = r.get("status");
    Subscription {
        id: r.get("id"),
        user_id: r.get("user_id"),
        payment_id: r.get("payment_id"),
        tariff: r.get("tariff"),
        start_date: r.get("start_date"),
        end_date: r.get("end_date"),
        status: SubscriptionStatus::parse(&status).unwrap_or(SubscriptionStatus::Active),
    }
}

/// Нарушение уникального ключа (payment_id, invite_link).
pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

// ПОЛЬЗОВАТЕЛИ

/// Создаёт или обновляет пользователя за один запрос. Пустой username
/// не затирает сохранённый; last_activity только растёт.
pub async fn upsert_user(pool: &PgPool, user_id: i64, username: &str) -> Result<User, sqlx::Error> {
    let row = sqlx::query(
        r#"INSERT INTO users (user_id, username)
           VALUES ($1, $2)
           ON CONFLICT (user_id) DO UPDATE SET
               username = CASE WHEN EXCLUDED.username <> '' THEN EXCLUDED.username
                               ELSE users.username END,
               last_activity = GREATEST(users.last_activity, NOW())
           RETURNING user_id, username, registration_date, last_activity"#,
    )
    .bind(user_id)
    .bind(username)
    .fetch_one(pool)
    .await?;

    Ok(row_to_user(&row))
}

pub async fn get_user(pool: &PgPool, user_id: i64) -> Result<Option<User>, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT user_id, username, registration_date, last_activity
           FROM users
           WHERE user_id = $1"#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| row_to_user(&r)))
}

pub async fn list_users(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<User>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT user_id, username, registration_date, last_activity
           FROM users
           ORDER BY registration_date ASC
           LIMIT $1 OFFSET $2"#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(row_to_user).collect())
}

pub async fn count_users(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let row = sqlx::query("SELECT COUNT(*) AS n FROM users")
        .fetch_one(pool)
        .await?;
    Ok(row.get("n"))
}

/// Количество платежей и подписок пользователя (для карточки в API).
pub async fn user_activity_counts(pool: &PgPool, user_id: i64) -> Result<(i64, i64), sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT
               (SELECT COUNT(*) FROM payments WHERE user_id = $1) AS payments,
               (SELECT COUNT(*) FROM subscriptions WHERE user_id = $1) AS subscriptions"#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok((row.get("payments"), row.get("subscriptions")))
}

// ПЛАТЕЖИ

#[allow(clippy::too_many_arguments)]
pub async fn create_payment(
    pool: &PgPool,
    user_id: i64,
    username: &str,
    tariff: &str,
    amount: f64,
    payment_id: &str,
    method: PaymentMethod,
    external_id: Option<&str>,
) -> Result<Payment, sqlx::Error> {
    // Платёж всегда принадлежит существующему пользователю.
    upsert_user(pool, user_id, username).await?;

    let row = sqlx::query(
        r#"INSERT INTO payments (user_id, payment_id, external_id, tariff, amount, status, method)
           VALUES ($1, $2, $3, $4, $5, 'pending', $6)
           RETURNING user_id, payment_id, external_id, tariff, amount, status, method,
                     payment_date, updated_at"#,
    )
    .bind(user_id)
    .bind(payment_id)
    .bind(external_id)
    .bind(tariff)
    .bind(amount)
    .bind(method.as_str())
    .fetch_one(pool)
    .await?;

    log::info!("платёж {payment_id} создан (метод: {})", method.as_str());
    Ok(row_to_payment(&row))
}

pub async fn get_payment(pool: &PgPool, payment_id: &str) -> Result<Option<Payment>, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT user_id, payment_id, external_id, tariff, amount, status, method,
                  payment_date, updated_at
           FROM payments
           WHERE payment_id = $1"#,
    )
    .bind(payment_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| row_to_payment(&r)))
}

/// Безусловное обновление статуса. Возвращает false, если платежа нет.
pub async fn update_payment_status(
    pool: &PgPool,
    payment_id: &str,
    status: PaymentStatus,
    external_id: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"UPDATE payments
           SET status = $2,
               external_id = COALESCE($3, external_id),
               updated_at = NOW()
           WHERE payment_id = $1"#,
    )
    .bind(payment_id)
    .bind(status.as_str())
    .bind(external_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        log::warn!("платёж {payment_id} не найден");
        return Ok(false);
    }

    log::info!("статус платежа {payment_id} обновлён на {}", status.as_str());
    Ok(true)
}

/// Переход pending → completed одним условным UPDATE. Количество
/// затронутых строк — единственный арбитр при гонке двойного подтверждения:
/// побочные эффекты выполняет только тот, кто получил 1.
pub async fn complete_payment_if_pending<'e>(
    executor: impl PgExecutor<'e>,
    payment_id: &str,
    external_id: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"UPDATE payments
           SET status = 'completed',
               external_id = COALESCE($2, external_id),
               updated_at = NOW()
           WHERE payment_id = $1 AND status = 'pending'"#,
    )
    .bind(payment_id)
    .bind(external_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Переход pending → failed, тоже условный: завершённый платёж
/// провалить нельзя.
pub async fn fail_payment_if_pending(
    pool: &PgPool,
    payment_id: &str,
    external_id: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"UPDATE payments
           SET status = 'failed',
               external_id = COALESCE($2, external_id),
               updated_at = NOW()
           WHERE payment_id = $1 AND status = 'pending'"#,
    )
    .bind(payment_id)
    .bind(external_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn list_payments(
    pool: &PgPool,
    status: Option<PaymentStatus>,
    limit: i64,
    offset: i64,
) -> Result<Vec<Payment>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT user_id, payment_id, external_id, tariff, amount, status, method,
                  payment_date, updated_at
           FROM payments
           WHERE ($1::text IS NULL OR status = $1)
           ORDER BY payment_date DESC
           LIMIT $2 OFFSET $3"#,
    )
    .bind(status.map(|s| s.as_str()))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(row_to_payment).collect())
}

pub async fn count_payments(
    pool: &PgPool,
    status: Option<PaymentStatus>,
) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(
        "SELECT COUNT(*) AS n FROM payments WHERE ($1::text IS NULL OR status = $1)",
    )
    .bind(status.map(|s| s.as_str()))
    .fetch_one(pool)
    .await?;
    Ok(row.get("n"))
}

pub async fn sum_completed_amount(pool: &PgPool) -> Result<f64, sqlx::Error> {
    let row = sqlx::query(
        "SELECT COALESCE(SUM(amount), 0)::float8 AS total FROM payments WHERE status = 'completed'",
    )
    .fetch_one(pool)
    .await?;
    Ok(row.get("total"))
}

// ПОДПИСКИ

pub async fn create_subscription<'e>(
    executor: impl PgExecutor<'e>,
    user_id: i64,
    payment_id: &str,
    tariff: &str,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
) -> Result<Subscription, sqlx::Error> {
    let row = sqlx::query(
        r#"INSERT INTO subscriptions (user_id, payment_id, tariff, start_date, end_date, status)
           VALUES ($1, $2, $3, $4, $5, 'active')
           RETURNING id, user_id, payment_id, tariff, start_date, end_date, status"#,
    )
    .bind(user_id)
    .bind(payment_id)
    .bind(tariff)
    .bind(start_date)
    .bind(end_date)
    .fetch_one(executor)
    .await?;

    log::info!("подписка для пользователя {user_id} создана (тариф: {tariff})");
    Ok(row_to_subscription(&row))
}

/// Активная подписка пользователя. При нескольких строках (не должно
/// случаться) берётся самая свежая по start_date.
pub async fn get_active_subscription(
    pool: &PgPool,
    user_id: i64,
) -> Result<Option<Subscription>, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT id, user_id, payment_id, tariff, start_date, end_date, status
           FROM subscriptions
           WHERE user_id = $1 AND status = 'active' AND end_date > NOW()
           ORDER BY start_date DESC
           LIMIT 1"#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| row_to_subscription(&r)))
}

pub async fn list_active_subscriptions(pool: &PgPool) -> Result<Vec<Subscription>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT id, user_id, payment_id, tariff, start_date, end_date, status
           FROM subscriptions
           WHERE status = 'active' AND end_date > NOW()
           ORDER BY start_date DESC"#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(row_to_subscription).collect())
}

/// Подписки, у которых срок уже вышел, но статус ещё active.
/// Их разбирает ежечасный свип.
pub async fn list_overdue_subscriptions(pool: &PgPool) -> Result<Vec<Subscription>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT id, user_id, payment_id, tariff, start_date, end_date, status
           FROM subscriptions
           WHERE status = 'active' AND end_date <= NOW()
           ORDER BY end_date ASC"#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(row_to_subscription).collect())
}

pub async fn expire_subscription(
    pool: &PgPool,
    user_id: i64,
    tariff: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"UPDATE subscriptions
           SET status = 'expired'
           WHERE user_id = $1 AND tariff = $2 AND status = 'active'"#,
    )
    .bind(user_id)
    .bind(tariff)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(false);
    }

    log::info!("подписка пользователя {user_id} на {tariff} истекла");
    Ok(true)
}

pub async fn count_active_subscriptions(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let row = sqlx::query("SELECT COUNT(*) AS n FROM subscriptions WHERE status = 'active'")
        .fetch_one(pool)
        .await?;
    Ok(row.get("n"))
}

// ИНВАЙТЫ

pub async fn create_invite(
    pool: &PgPool,
    user_id: i64,
    chat_id: i64,
    invite_link: &str,
) -> Result<Invite, sqlx::Error> {
    let row = sqlx::query(
        r#"INSERT INTO invites (user_id, chat_id, invite_link)
           VALUES ($1, $2, $3)
           RETURNING user_id, chat_id, invite_link, is_used, created_at, used_at"#,
    )
    .bind(user_id)
    .bind(chat_id)
    .bind(invite_link)
    .fetch_one(pool)
    .await?;

    log::debug!("инвайт для {user_id} в чат {chat_id} сохранён");
    Ok(Invite {
        user_id: row.get("user_id"),
        chat_id: row.get("chat_id"),
        invite_link: row.get("invite_link"),
        is_used: row.get("is_used"),
        created_at: row.get("created_at"),
        used_at: row.get("used_at"),
    })
}

/// Помечает инвайт использованным. Обратного перехода нет: повторный
/// вызов не сбрасывает used_at.
pub async fn mark_invite_used(pool: &PgPool, invite_link: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"UPDATE invites
           SET is_used = TRUE, used_at = COALESCE(used_at, NOW())
           WHERE invite_link = $1"#,
    )
    .bind(invite_link)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        log::warn!("инвайт {invite_link} не найден");
        return Ok(false);
    }

    Ok(true)
}

/// Истинно только для точной тройки (user, chat, link) с is_used = false.
pub async fn is_valid_invite(
    pool: &PgPool,
    user_id: i64,
    chat_id: i64,
    invite_link: &str,
) -> Result<bool, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT 1 AS one
           FROM invites
           WHERE user_id = $1 AND chat_id = $2 AND invite_link = $3 AND is_used = FALSE"#,
    )
    .bind(user_id)
    .bind(chat_id)
    .bind(invite_link)
    .fetch_optional(pool)
    .await?;

    Ok(row.is_some())
}
