// src/api/bot.rs
//
// Webhook бот-транспорта. Из всего потока апдейтов нас интересуют
// переходы участников «не состоял → состоит»: их разбирает сторожевой
// контроль в admission.

use actix_web::{post, web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::{admission, AppState};

#[derive(Debug, Deserialize)]
pub struct TgUser {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct TgChat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct TgChatMember {
    pub status: String,
    pub user: TgUser,
}

#[derive(Debug, Deserialize)]
pub struct TgInviteLink {
    pub invite_link: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatMemberUpdated {
    pub chat: TgChat,
    pub old_chat_member: TgChatMember,
    pub new_chat_member: TgChatMember,
    #[serde(default)]
    pub invite_link: Option<TgInviteLink>,
}

#[derive(Debug, Deserialize)]
pub struct BotUpdate {
    #[serde(default)]
    pub update_id: i64,
    #[serde(default)]
    pub chat_member: Option<ChatMemberUpdated>,
}

pub fn is_member_status(status: &str) -> bool {
    matches!(status, "member" | "administrator" | "creator")
}

#[post("/webhook/bot")]
pub async fn bot_webhook(
    payload: web::Json<BotUpdate>,
    state: web::Data<AppState>,
) -> HttpResponse {
    let update = payload.into_inner();

    if let Some(event) = update.chat_member {
        let joined = !is_member_status(&event.old_chat_member.status)
            && is_member_status(&event.new_chat_member.status);

        if joined {
            admission::handle_member_joined(
                state.get_ref(),
                event.new_chat_member.user.id,
                event.chat.id,
                event.invite_link.as_ref().map(|l| l.invite_link.as_str()),
            )
            .await;
        }
    }

    HttpResponse::Ok().json(json!({"ok": true}))
}
