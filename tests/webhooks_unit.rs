use serde_json::json;

use subgate::admission::{Access, AdmissionReport, ChannelOutcome};
use subgate::api::bot::is_member_status;
use subgate::api::webhook::{classify_status, WebhookStatus};

#[test]
fn numeric_statuses_classify() {
    assert_eq!(classify_status(&json!(1)), WebhookStatus::Success);
    assert_eq!(classify_status(&json!(2)), WebhookStatus::Failed);
    assert_eq!(classify_status(&json!(0)), WebhookStatus::Unknown);
    assert_eq!(classify_status(&json!(42)), WebhookStatus::Unknown);
}

#[test]
fn string_statuses_classify() {
    assert_eq!(classify_status(&json!("success")), WebhookStatus::Success);
    assert_eq!(classify_status(&json!("completed")), WebhookStatus::Success);
    assert_eq!(classify_status(&json!("failed")), WebhookStatus::Failed);
    assert_eq!(classify_status(&json!("error")), WebhookStatus::Failed);
    assert_eq!(classify_status(&json!("pending")), WebhookStatus::Unknown);
}

#[test]
fn odd_payloads_do_not_classify() {
    assert_eq!(classify_status(&json!(null)), WebhookStatus::Unknown);
    assert_eq!(classify_status(&json!({"code": 1})), WebhookStatus::Unknown);
    assert_eq!(classify_status(&json!([1])), WebhookStatus::Unknown);
}

#[test]
fn member_statuses() {
    assert!(is_member_status("member"));
    assert!(is_member_status("administrator"));
    assert!(is_member_status("creator"));
    assert!(!is_member_status("left"));
    assert!(!is_member_status("kicked"));
    assert!(!is_member_status("restricted"));
}

#[test]
fn report_without_channels_is_an_error_message() {
    let report = AdmissionReport {
        tariff_label: "ghost · Призрак (30 дней)".to_string(),
        outcomes: None,
    };
    assert!(report.render().contains("❌"));
    assert_eq!(report.granted_directly(), 0);
}

#[test]
fn report_lists_every_channel_outcome() {
    let report = AdmissionReport {
        tariff_label: "basic_1 · Базовый 1 (30 дней)".to_string(),
        outcomes: Some(vec![
            ChannelOutcome {
                chat_id: -1,
                access: Access::Joined,
            },
            ChannelOutcome {
                chat_id: -2,
                access: Access::InviteLink("https://t.me/+abc".to_string()),
            },
            ChannelOutcome {
                chat_id: -3,
                access: Access::Delayed,
            },
        ]),
    };

    let text = report.render();
    assert!(text.contains("✅ Ваша подписка активирована на 30 дней"));
    assert!(text.contains("Базовый 1"));
    assert!(text.contains("https://t.me/+abc"));
    assert!(text.contains("⏳"));
    assert_eq!(report.granted_directly(), 1);
}

#[test]
fn lifetime_report_says_forever() {
    let report = AdmissionReport {
        tariff_label: "all · ✅ ВСЕ КАНАЛЫ (Навсегда)".to_string(),
        outcomes: Some(vec![ChannelOutcome {
            chat_id: -1,
            access: Access::Joined,
        }]),
    };
    assert!(report.render().contains("активирована навсегда"));
}
