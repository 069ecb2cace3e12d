use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::webhook::payment_webhook,
        crate::api::payments::initiate_payment,
        crate::api::payments::confirm_payment,
        crate::api::payments::list_payments,
        crate::api::payments::get_payment,
        crate::api::users::list_users,
        crate::api::users::get_user,
        crate::api::stats::get_stats
    ),
    components(
        schemas(
            crate::api::webhook::PaymentWebhook,
            crate::api::payments::InitiateRequest,
            crate::models::User,
            crate::models::Payment,
            crate::models::Subscription,
            crate::models::Invite,
            crate::models::PaymentStatus,
            crate::models::PaymentMethod,
            crate::models::SubscriptionStatus
        )
    ),
    tags(
        (name = "payments", description = "Создание и проверка платежей"),
        (name = "users", description = "Пользователи бота"),
        (name = "stats", description = "Сводная статистика"),
        (name = "webhooks", description = "Callback платёжной системы")
    )
)]
pub struct ApiDoc;
