// src/admission.rs
//
// Выдача доступа к каналам по подтверждённой подписке. Сначала
// пробуем одобрить заявку на вступление; если не вышло — одноразовая
// инвайт-ссылка на сутки. Подписка к этому моменту уже зафиксирована,
// поэтому неудачи здесь не откатывают платёж.

use chrono::{Duration, Utc};

use crate::config::{is_lifetime_label, tier_of_label};
use crate::{db, AppState};

/// Срок жизни запасной инвайт-ссылки.
const INVITE_TTL_HOURS: i64 = 24;

/// На сколько банится вступивший без подписки.
const GATE_BAN_SECONDS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// Заявка на вступление одобрена напрямую.
    Joined,
    /// Выдана инвайт-ссылка.
    InviteLink(String),
    /// Ни добавить, ни выдать ссылку не удалось; доступ выдадут позже.
    Delayed,
}

#[derive(Debug, Clone)]
pub struct ChannelOutcome {
    pub chat_id: i64,
    pub access: Access,
}

#[derive(Debug, Clone)]
pub struct AdmissionReport {
    pub tariff_label: String,
    /// None — тариф не сопоставлен ни одному каналу.
    pub outcomes: Option<Vec<ChannelOutcome>>,
}

impl AdmissionReport {
    pub fn granted_directly(&self) -> usize {
        self.outcomes
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter(|o| o.access == Access::Joined)
            .count()
    }

    /// Сообщение пользователю: сводка по каждому каналу.
    pub fn render(&self) -> String {
        let Some(outcomes) = &self.outcomes else {
            return "❌ Ошибка: канал не найден. Обратитесь к администратору.".to_string();
        };

        let mut text = format!(
            "✅ Ваша подписка активирована {}!\n\nТариф: {}\n\n",
            validity_wording(&self.tariff_label),
            self.tariff_label
        );

        for outcome in outcomes {
            match &outcome.access {
                Access::Joined => text.push_str("  ✅ Канал добавлен\n"),
                Access::InviteLink(link) => {
                    text.push_str(&format!("  🔗 Ссылка для вступления: {link}\n"))
                }
                Access::Delayed => {
                    text.push_str("  ⏳ Доступ будет выдан позже, мы уже разбираемся\n")
                }
            }
        }

        text
    }
}

/// «на 30 дней» / «навсегда» — по тарифной подписи.
pub fn validity_wording(tariff_label: &str) -> &'static str {
    if is_lifetime_label(tariff_label) {
        "навсегда"
    } else {
        "на 30 дней"
    }
}

/// Проводит пользователя во все каналы тарифа и шлёт ему сводку.
pub async fn admit(state: &AppState, user_id: i64, tariff_label: &str) -> AdmissionReport {
    let tier = tier_of_label(tariff_label).to_lowercase();
    let channels = state.config.channels_for_tier(&tier);

    let report = match channels {
        None => {
            log::error!("тариф «{tariff_label}» не сопоставлен каналам (ключ: {tier})");
            AdmissionReport {
                tariff_label: tariff_label.to_string(),
                outcomes: None,
            }
        }
        Some(channels) => {
            let mut outcomes = Vec::with_capacity(channels.len());
            for chat_id in channels {
                let access = admit_to_channel(state, user_id, chat_id).await;
                outcomes.push(ChannelOutcome { chat_id, access });
            }
            AdmissionReport {
                tariff_label: tariff_label.to_string(),
                outcomes: Some(outcomes),
            }
        }
    };

    state.bot.send_message(user_id, &report.render()).await;
    report
}

async fn admit_to_channel(state: &AppState, user_id: i64, chat_id: i64) -> Access {
    if state.bot.approve_join_request(chat_id, user_id).await {
        return Access::Joined;
    }

    // Запасной путь: одноразовая ссылка на сутки.
    let expire = (Utc::now() + Duration::hours(INVITE_TTL_HOURS)).timestamp();
    match state.bot.create_invite_link(chat_id, expire).await {
        Ok(link) => {
            if let Err(e) = db::create_invite(&state.pool, user_id, chat_id, &link).await {
                // Ссылка уже выдана, потеря записи не должна лишать доступа.
                log::error!("не удалось сохранить инвайт для {user_id} в {chat_id}: {e}");
            }
            log::info!("инвайт создан для {user_id} в чат {chat_id}");
            Access::InviteLink(link)
        }
        Err(e) => {
            log::error!("ошибка создания инвайта для {user_id} в {chat_id}: {e}");
            Access::Delayed
        }
    }
}

/// Сторожевой контроль вступлений: пользователь стал участником
/// отслеживаемого канала. Без активной подписки — временный бан.
/// С подпиской — если вход был по нашей ссылке, гасим её.
///
/// Проверяется только факт «есть активная подписка», без сверки тарифа
/// с конкретным каналом — поведение исходной системы сохранено
/// сознательно (см. DESIGN.md).
pub async fn handle_member_joined(
    state: &AppState,
    user_id: i64,
    chat_id: i64,
    invite_link: Option<&str>,
) {
    let subscription = match db::get_active_subscription(&state.pool, user_id).await {
        Ok(s) => s,
        Err(e) => {
            log::error!("ошибка проверки подписки {user_id}: {e}");
            return;
        }
    };

    if subscription.is_none() {
        let until = (Utc::now() + Duration::seconds(GATE_BAN_SECONDS)).timestamp();
        if let Err(e) = state.bot.ban_member(chat_id, user_id, until).await {
            log::error!("ошибка при бане пользователя {user_id}: {e}");
        }
        state
            .bot
            .send_message(user_id, "⚠️ Доступ запрещен. У вас нет активной подписки.")
            .await;
        return;
    }

    if let Some(link) = invite_link {
        match db::is_valid_invite(&state.pool, user_id, chat_id, link).await {
            Ok(true) => {
                if let Err(e) = db::mark_invite_used(&state.pool, link).await {
                    log::error!("не удалось погасить инвайт {link}: {e}");
                }
            }
            Ok(false) => {
                log::warn!("вступление {user_id} в {chat_id} по чужой или погашенной ссылке");
            }
            Err(e) => log::error!("ошибка проверки инвайта {link}: {e}"),
        }
    }

    log::info!("пользователь {user_id} вступил в канал {chat_id}");
}
