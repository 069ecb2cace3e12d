// HTTP-тесты вебхуков поверх настоящего Postgres.
// Требуют TEST_DATABASE_URL; запускаются через `cargo test -- --ignored`.

use actix_web::test::TestRequest;
use actix_web::{test, web, App};
use serde_json::json;
use std::sync::Arc;

use subgate::api::bot::bot_webhook;
use subgate::api::webhook::payment_webhook;
use subgate::db;
use subgate::models::{PaymentMethod, PaymentStatus};
use subgate::AppState;

mod support;

fn webhook_state(test_db: &support::TestDb, bot: Arc<support::RecordingBot>) -> AppState {
    support::build_state(
        test_db.pool.clone(),
        Arc::new(support::StubAcquirer::default()),
        Arc::new(support::StubChain { found: false }),
        bot,
    )
}

async fn seed_pending_payment(pool: &sqlx::PgPool, payment_id: &str) {
    db::create_payment(
        pool,
        101,
        "alice",
        "basic_1 · Базовый 1 (30 дней)",
        1900.0,
        payment_id,
        PaymentMethod::Card,
        Some("ext-1"),
    )
    .await
    .expect("create payment");
}

#[actix_web::test]
#[ignore]
async fn webhook_without_required_fields_is_bad_request() {
    let test_db = support::init_test_db().await;
    let bot = Arc::new(support::RecordingBot::default());
    let state = web::Data::new(webhook_state(&test_db, bot));
    let app = test::init_service(App::new().app_data(state).service(payment_webhook)).await;

    let req = TestRequest::post()
        .uri("/webhook/payment")
        .set_json(json!({"merchant_order_id": "PAY_101_1"}))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
#[ignore]
async fn success_webhook_completes_payment_and_creates_subscription() {
    let test_db = support::init_test_db().await;
    let bot = Arc::new(support::RecordingBot::default());
    let state = web::Data::new(webhook_state(&test_db, bot.clone()));
    seed_pending_payment(&test_db.pool, "PAY_101_1").await;

    let app = test::init_service(App::new().app_data(state.clone()).service(payment_webhook)).await;

    let req = TestRequest::post()
        .uri("/webhook/payment")
        .set_json(json!({
            "merchant_order_id": "PAY_101_1",
            "payment_id": "ext-7",
            "status": 1
        }))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let payment = db::get_payment(&test_db.pool, "PAY_101_1")
        .await
        .expect("get")
        .expect("payment exists");
    assert_eq!(payment.status, PaymentStatus::Completed);
    assert_eq!(payment.external_id.as_deref(), Some("ext-7"));

    assert!(db::get_active_subscription(&test_db.pool, 101)
        .await
        .expect("query")
        .is_some());

    // Повторная доставка того же события не плодит подписок.
    let req = TestRequest::post()
        .uri("/webhook/payment")
        .set_json(json!({
            "merchant_order_id": "PAY_101_1",
            "payment_id": "ext-7",
            "status": 1
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let (_, subscriptions) = db::user_activity_counts(&test_db.pool, 101)
        .await
        .expect("counts");
    assert_eq!(subscriptions, 1);
}

#[actix_web::test]
#[ignore]
async fn failed_webhook_marks_payment_failed() {
    let test_db = support::init_test_db().await;
    let bot = Arc::new(support::RecordingBot::default());
    let state = web::Data::new(webhook_state(&test_db, bot));
    seed_pending_payment(&test_db.pool, "PAY_101_1").await;

    let app = test::init_service(App::new().app_data(state).service(payment_webhook)).await;

    let req = TestRequest::post()
        .uri("/webhook/payment")
        .set_json(json!({
            "merchant_order_id": "PAY_101_1",
            "payment_id": "ext-7",
            "status": "failed"
        }))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let payment = db::get_payment(&test_db.pool, "PAY_101_1")
        .await
        .expect("get")
        .expect("payment exists");
    assert_eq!(payment.status, PaymentStatus::Failed);
}

#[actix_web::test]
#[ignore]
async fn unknown_payment_is_acknowledged_without_effects() {
    let test_db = support::init_test_db().await;
    let bot = Arc::new(support::RecordingBot::default());
    let state = web::Data::new(webhook_state(&test_db, bot));

    let app = test::init_service(App::new().app_data(state).service(payment_webhook)).await;

    let req = TestRequest::post()
        .uri("/webhook/payment")
        .set_json(json!({
            "merchant_order_id": "PAY_404_1",
            "payment_id": "ext-7",
            "status": "completed"
        }))
        .to_request();

    // 200, чтобы провайдер не ретраил неизвестный заказ.
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
}

#[actix_web::test]
#[ignore]
async fn unknown_status_leaves_payment_untouched() {
    let test_db = support::init_test_db().await;
    let bot = Arc::new(support::RecordingBot::default());
    let state = web::Data::new(webhook_state(&test_db, bot));
    seed_pending_payment(&test_db.pool, "PAY_101_1").await;

    let app = test::init_service(App::new().app_data(state).service(payment_webhook)).await;

    let req = TestRequest::post()
        .uri("/webhook/payment")
        .set_json(json!({
            "merchant_order_id": "PAY_101_1",
            "payment_id": "ext-7",
            "status": "processing"
        }))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let payment = db::get_payment(&test_db.pool, "PAY_101_1")
        .await
        .expect("get")
        .expect("payment exists");
    assert_eq!(payment.status, PaymentStatus::Pending);
}

#[actix_web::test]
#[ignore]
async fn bot_webhook_bans_member_without_subscription() {
    let test_db = support::init_test_db().await;
    let bot = Arc::new(support::RecordingBot::default());
    let state = web::Data::new(webhook_state(&test_db, bot.clone()));

    db::upsert_user(&test_db.pool, 202, "stranger")
        .await
        .expect("user");

    let app = test::init_service(App::new().app_data(state).service(bot_webhook)).await;

    let req = TestRequest::post()
        .uri("/webhook/bot")
        .set_json(json!({
            "update_id": 1,
            "chat_member": {
                "chat": {"id": -1},
                "old_chat_member": {"status": "left", "user": {"id": 202}},
                "new_chat_member": {"status": "member", "user": {"id": 202}}
            }
        }))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    assert!(bot.banned(-1, 202));
}

#[actix_web::test]
#[ignore]
async fn bot_webhook_ignores_non_join_transitions() {
    let test_db = support::init_test_db().await;
    let bot = Arc::new(support::RecordingBot::default());
    let state = web::Data::new(webhook_state(&test_db, bot.clone()));

    let app = test::init_service(App::new().app_data(state).service(bot_webhook)).await;

    // member → administrator: уже состоял, сторожу делать нечего.
    let req = TestRequest::post()
        .uri("/webhook/bot")
        .set_json(json!({
            "update_id": 2,
            "chat_member": {
                "chat": {"id": -1},
                "old_chat_member": {"status": "member", "user": {"id": 202}},
                "new_chat_member": {"status": "administrator", "user": {"id": 202}}
            }
        }))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    assert!(!bot.banned(-1, 202));
}
