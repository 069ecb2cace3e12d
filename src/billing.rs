// src/billing.rs
//
// Оркестратор платежей: создание платёжного намерения, проверка
// оплаты и фиксация подписки. Машина состояний платежа:
// pending → completed (ровно один победитель CAS выполняет побочные
// эффекты) либо pending → failed по явному сигналу провайдера.

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::admission::{self, AdmissionReport};
use crate::config::{is_lifetime_label, Term};
use crate::db;
use crate::error::BillingError;
use crate::models::{Payment, PaymentMethod, Subscription};
use crate::AppState;

#[derive(Debug)]
pub enum InitiateOutcome {
    /// Карта/СБП: заказ создан в эквайринге, пользователя ведут на checkout.
    Checkout {
        payment_id: String,
        payment_url: String,
        amount: f64,
        tariff_label: String,
    },
    /// USDT: платёж ждёт перевода на депозитный адрес с ID в комментарии.
    CryptoDeposit {
        payment_id: String,
        address: String,
        network: String,
        amount_usdt: f64,
        amount: f64,
        tariff_label: String,
    },
}

#[derive(Debug)]
pub enum ConfirmOutcome {
    /// Оплата подтверждена этим вызовом; подписка создана, доступ выдан.
    Activated {
        subscription: Subscription,
        report: AdmissionReport,
    },
    /// Платёж уже завершён раньше — без повторных побочных эффектов.
    AlreadyActive,
    /// Провайдер оплату (пока) не видит. Статус не тронут, можно повторять.
    NotConfirmed,
    /// Платёж переведён в failed по сигналу провайдера.
    MarkedFailed,
    /// Платёж уже в терминальном failed/cancelled — сигнал провайдера
    /// ничего не изменил.
    Unchanged,
    NotFound,
}

/// Дата конца подписки: 30 дней для срочных тарифов, для «вечных» —
/// сентинель далеко в будущем.
pub fn subscription_end(tariff_label: &str, start: DateTime<Utc>) -> DateTime<Utc> {
    if is_lifetime_label(tariff_label) {
        Utc.with_ymd_and_hms(2100, 1, 1, 0, 0, 0).unwrap()
    } else {
        start + Duration::days(30)
    }
}

/// Сумма депозита в USDT по фиатной цене и курсу.
pub fn usdt_amount(amount: f64, exchange_rate: f64) -> f64 {
    amount / exchange_rate
}

/// Создаёт платёж по выбранному тарифу, сроку и методу.
pub async fn initiate_payment(
    state: &AppState,
    user_id: i64,
    username: &str,
    tariff_id: &str,
    duration: &str,
    method: PaymentMethod,
) -> Result<InitiateOutcome, BillingError> {
    let term = Term::parse(duration).ok_or(BillingError::InvalidTariff)?;
    let tariff = state
        .config
        .tariff(tariff_id)
        .ok_or(BillingError::InvalidTariff)?;
    let amount = tariff.price(term).ok_or(BillingError::InvalidTariff)?;
    let tariff_label = state
        .config
        .tariff_label(tariff_id, term)
        .ok_or(BillingError::InvalidTariff)?;

    let payment_id = format!("PAY_{user_id}_{}", Utc::now().timestamp());

    match method {
        PaymentMethod::Usdt => {
            let amount_usdt = usdt_amount(amount, state.config.crypto_exchange_rate);

            create_payment(state, user_id, username, &tariff_label, amount, &payment_id, method, None)
                .await?;

            Ok(InitiateOutcome::CryptoDeposit {
                payment_id,
                address: state.config.crypto_payment_address.clone(),
                network: state.config.crypto_payment_network.clone(),
                amount_usdt,
                amount,
                tariff_label,
            })
        }
        PaymentMethod::Card | PaymentMethod::Sbp => {
            let order = state
                .acquirer
                .create_order(amount, &payment_id, method, user_id)
                .await
                .map_err(|e| BillingError::Provider(e.to_string()))?;

            create_payment(
                state,
                user_id,
                username,
                &tariff_label,
                amount,
                &payment_id,
                method,
                order.external_id.as_deref(),
            )
            .await?;

            Ok(InitiateOutcome::Checkout {
                payment_id,
                payment_url: order.payment_url,
                amount,
                tariff_label,
            })
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn create_payment(
    state: &AppState,
    user_id: i64,
    username: &str,
    tariff_label: &str,
    amount: f64,
    payment_id: &str,
    method: PaymentMethod,
    external_id: Option<&str>,
) -> Result<Payment, BillingError> {
    db::create_payment(
        &state.pool,
        user_id,
        username,
        tariff_label,
        amount,
        payment_id,
        method,
        external_id,
    )
    .await
    .map_err(|e| {
        if db::is_unique_violation(&e) {
            BillingError::DuplicateKey
        } else {
            BillingError::Db(e)
        }
    })
}

/// Пользовательская проверка «оплатил — проверь ещё раз». Идемпотентна:
/// на уже завершённом платеже ничего не делает. Отрицательный ответ
/// провайдера не проваливает платёж — только явный сигнал об ошибке.
pub async fn confirm_payment(
    state: &AppState,
    payment_id: &str,
) -> Result<ConfirmOutcome, BillingError> {
    let Some(payment) = db::get_payment(&state.pool, payment_id).await? else {
        return Ok(ConfirmOutcome::NotFound);
    };

    match payment.status {
        crate::models::PaymentStatus::Completed => return Ok(ConfirmOutcome::AlreadyActive),
        crate::models::PaymentStatus::Pending => {}
        // Терминальные failed/cancelled не воскрешают.
        _ => return Ok(ConfirmOutcome::NotConfirmed),
    }

    let verified = match payment.method {
        PaymentMethod::Usdt => {
            let expected = usdt_amount(payment.amount, state.config.crypto_exchange_rate);
            state.chain.find_deposit(&payment.payment_id, expected).await
        }
        PaymentMethod::Card | PaymentMethod::Sbp => match payment.external_id.as_deref() {
            Some(external_id) => state.acquirer.check_order(external_id).await,
            // Без внешнего ID проверять нечего: ждём webhook или оператора.
            None => false,
        },
    };

    if !verified {
        return Ok(ConfirmOutcome::NotConfirmed);
    }

    grant_access(state, &payment, None).await
}

/// Обработка статуса из внешнего канала (webhook эквайринга).
/// Успех идёт тем же CAS-путём, что и ручное подтверждение, поэтому
/// подписка и выдача доступа случаются не больше одного раза на платёж.
pub async fn apply_external_status(
    state: &AppState,
    payment_id: &str,
    external_id: &str,
    success: bool,
) -> Result<ConfirmOutcome, BillingError> {
    let Some(payment) = db::get_payment(&state.pool, payment_id).await? else {
        return Ok(ConfirmOutcome::NotFound);
    };

    if success {
        if payment.status == crate::models::PaymentStatus::Completed {
            return Ok(ConfirmOutcome::AlreadyActive);
        }
        return grant_access(state, &payment, Some(external_id)).await;
    }

    if db::fail_payment_if_pending(&state.pool, payment_id, Some(external_id)).await? {
        log::warn!("платёж {payment_id} отклонён провайдером");
        Ok(ConfirmOutcome::MarkedFailed)
    } else {
        settled_outcome(state, payment_id).await
    }
}

/// Исход для проигравшего условный UPDATE: параллельный победитель мог
/// платёж и завершить, и провалить — отвечаем по фактическому статусу.
async fn settled_outcome(
    state: &AppState,
    payment_id: &str,
) -> Result<ConfirmOutcome, BillingError> {
    let status = db::get_payment(&state.pool, payment_id)
        .await?
        .map(|p| p.status);

    Ok(match status {
        Some(crate::models::PaymentStatus::Completed) => ConfirmOutcome::AlreadyActive,
        Some(_) => ConfirmOutcome::Unchanged,
        None => ConfirmOutcome::NotFound,
    })
}

/// Фиксация успеха: переход в completed и создание подписки — одна
/// транзакция; выдача доступа и уведомления — уже после коммита,
/// они внешние и безопасно повторяемы.
async fn grant_access(
    state: &AppState,
    payment: &Payment,
    external_id: Option<&str>,
) -> Result<ConfirmOutcome, BillingError> {
    let mut tx = state.pool.begin().await?;

    let won =
        db::complete_payment_if_pending(&mut *tx, &payment.payment_id, external_id).await?;
    if !won {
        tx.rollback().await?;
        return settled_outcome(state, &payment.payment_id).await;
    }

    let start = Utc::now();
    let end = subscription_end(&payment.tariff, start);
    let subscription = db::create_subscription(
        &mut *tx,
        payment.user_id,
        &payment.payment_id,
        &payment.tariff,
        start,
        end,
    )
    .await?;

    tx.commit().await?;

    let report = admission::admit(state, payment.user_id, &payment.tariff).await;
    notify_admin(state, payment).await;

    Ok(ConfirmOutcome::Activated {
        subscription,
        report,
    })
}

async fn notify_admin(state: &AppState, payment: &Payment) {
    if state.config.admin_id == 0 {
        return;
    }

    let username = match db::get_user(&state.pool, payment.user_id).await {
        Ok(Some(u)) if !u.username.is_empty() => format!("@{}", u.username),
        _ => "нет username".to_string(),
    };

    let text = format!(
        "💸 <b>Новый платеж!</b>\n\n\
         👤 Пользователь: {username}\n\
         📌 Тариф: {}\n\
         💰 Сумма: {}₽\n\
         💳 Метод: {}\n\
         🆔 ID: {}",
        payment.tariff,
        payment.amount,
        payment.method.as_str(),
        payment.payment_id
    );

    state.bot.send_message(state.config.admin_id, &text).await;
}
