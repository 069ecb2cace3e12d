// src/error.rs

use thiserror::Error;

/// Ошибки платёжного контура. Разделение важно для HTTP-границы:
/// InvalidTariff/InvalidInput — 400, Provider — 502, остальное — 500.
#[derive(Debug, Error)]
pub enum BillingError {
    #[error("неизвестный тариф или срок подписки")]
    InvalidTariff,

    #[error("некорректные входные данные: {0}")]
    InvalidInput(String),

    #[error("платёж с таким ID уже существует")]
    DuplicateKey,

    #[error("ошибка платёжного провайдера: {0}")]
    Provider(String),

    #[error("ошибка базы данных: {0}")]
    Db(#[from] sqlx::Error),
}
