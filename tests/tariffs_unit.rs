use chrono::{Datelike, Duration, Utc};

use subgate::billing::{subscription_end, usdt_amount};
use subgate::config::{is_lifetime_label, tier_of_label, Config, Term};

fn demo_config() -> Config {
    // Без переменных окружения берутся демо-сетка и значения по умолчанию.
    Config::from_env()
}

#[test]
fn term_parsing_accepts_known_values() {
    assert_eq!(Term::parse("30_days"), Some(Term::Days30));
    assert_eq!(Term::parse("forever"), Some(Term::Forever));
    assert_eq!(Term::parse("7_days"), None);
    assert_eq!(Term::parse(""), None);
}

#[test]
fn label_starts_with_tariff_key_and_names_tariff() {
    let config = demo_config();
    let label = config.tariff_label("basic_1", Term::Days30).expect("label");

    assert!(label.starts_with("basic_1"));
    assert!(label.contains("Базовый 1"));
    assert!(label.contains("30 дней"));
    assert_eq!(tier_of_label(&label), "basic_1");
}

#[test]
fn label_for_unknown_tariff_is_none() {
    let config = demo_config();
    assert!(config.tariff_label("gold_9", Term::Days30).is_none());
}

#[test]
fn forever_label_is_lifetime() {
    let config = demo_config();
    let forever = config.tariff_label("basic_1", Term::Forever).expect("label");
    let monthly = config.tariff_label("basic_1", Term::Days30).expect("label");

    assert!(is_lifetime_label(&forever));
    assert!(!is_lifetime_label(&monthly));
}

#[test]
fn all_tariff_is_lifetime_regardless_of_wording() {
    assert!(is_lifetime_label("all · ✅ ВСЕ КАНАЛЫ (Навсегда)"));
    assert!(is_lifetime_label("all что угодно"));
}

#[test]
fn all_tariff_has_no_monthly_price() {
    let config = demo_config();
    let all = config.tariff("all").expect("tariff");
    assert!(all.price(Term::Days30).is_none());
    assert!(all.price(Term::Forever).is_some());
}

#[test]
fn tier_channels_resolve_directly() {
    let config = demo_config();
    assert_eq!(config.channels_for_tier("standard_1"), Some(vec![-3, -2]));
    assert_eq!(config.channels_for_tier("unknown"), None);
}

#[test]
fn all_tier_unions_channels_without_duplicates() {
    let config = demo_config();
    let channels = config.channels_for_tier("all").expect("channels");

    // -2 и -3 встречаются и в basic, и в standard_1 — без дублей.
    assert_eq!(channels.iter().filter(|id| **id == -2).count(), 1);
    assert_eq!(channels.iter().filter(|id| **id == -3).count(), 1);
    assert_eq!(channels.len(), 11);
    for id in [-1, -2, -3, -5, -6, -7, -8, -9, -10, -11, -12] {
        assert!(channels.contains(&id), "нет канала {id}");
    }
}

#[test]
fn monthly_subscription_ends_in_thirty_days() {
    let start = Utc::now();
    let end = subscription_end("basic_1 · Базовый 1 (30 дней)", start);
    assert_eq!(end, start + Duration::days(30));
}

#[test]
fn lifetime_subscription_ends_far_in_the_future() {
    let start = Utc::now();
    let end = subscription_end("basic_1 · Базовый 1 (Навсегда)", start);
    assert!(end.year() >= 2100);
}

#[test]
fn usdt_amount_follows_exchange_rate() {
    let usdt = usdt_amount(1900.0, 90.0);
    assert!((usdt - 1900.0 / 90.0).abs() < 1e-9);
}
