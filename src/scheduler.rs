// src/scheduler.rs
//
// Ежечасный свип истёкших подписок. Живёт как отдельная задача с
// каналом остановки: падение одной итерации логируется и не ломает
// следующую.

use std::time::Duration;

use tokio::sync::watch;

use crate::{db, AppState};

const SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

pub async fn run_expiry_sweeper(state: AppState, mut shutdown: watch::Receiver<bool>) {
    log::info!("свип подписок запущен (интервал {SWEEP_INTERVAL:?})");

    loop {
        match sweep_expired(&state).await {
            Ok(0) => log::debug!("истёкших подписок нет"),
            Ok(n) => log::info!("помечено истёкшими подписок: {n}"),
            Err(e) => log::error!("ошибка свипа подписок: {e}"),
        }

        tokio::select! {
            _ = tokio::time::sleep(SWEEP_INTERVAL) => {}
            _ = shutdown.changed() => {
                log::info!("свип подписок остановлен");
                return;
            }
        }
    }
}

/// Находит активные подписки с вышедшим сроком и помечает их
/// истёкшими, предупреждая пользователя.
pub async fn sweep_expired(state: &AppState) -> Result<usize, sqlx::Error> {
    let overdue = db::list_overdue_subscriptions(&state.pool).await?;

    let mut expired = 0;
    for sub in &overdue {
        if db::expire_subscription(&state.pool, sub.user_id, &sub.tariff).await? {
            expired += 1;
            state
                .bot
                .send_message(
                    sub.user_id,
                    &format!("⌛ Ваша подписка «{}» истекла.", sub.tariff),
                )
                .await;
        }
    }

    Ok(expired)
}
