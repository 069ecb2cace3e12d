// src/config.rs

use std::collections::HashMap;
use std::env;

/// Срок подписки, выбираемый пользователем.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Term {
    Days30,
    Forever,
}

impl Term {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "30_days" => Some(Term::Days30),
            "forever" => Some(Term::Forever),
            _ => None,
        }
    }

    /// Человекочитаемое окончание для тарифной подписи.
    pub fn label(&self) -> &'static str {
        match self {
            Term::Days30 => "30 дней",
            Term::Forever => "Навсегда",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Tariff {
    pub name: &'static str,
    pub price_30_days: Option<f64>,
    pub price_forever: Option<f64>,
    pub description: &'static str,
}

impl Tariff {
    pub fn price(&self, term: Term) -> Option<f64> {
        match term {
            Term::Days30 => self.price_30_days,
            Term::Forever => self.price_forever,
        }
    }
}

/// Неизменяемая конфигурация процесса: секреты, тарифная сетка и карта
/// каналов. Собирается один раз на старте и дальше только читается.
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub admin_id: i64,

    // Эквайринг (карта/СБП)
    pub shop_id: i64,
    pub shop_secret: String,
    pub acquiring_api_url: String,
    pub callback_base_url: String,

    // Криптовалюта (USDT)
    pub crypto_payment_address: String,
    pub crypto_payment_network: String,
    pub crypto_exchange_rate: f64,
    pub trongrid_api_key: String,
    pub tron_node_url: String,

    pub tariffs: HashMap<&'static str, Tariff>,
    pub channels: HashMap<&'static str, Vec<i64>>,
}

impl Config {
    pub fn from_env() -> Config {
        Config {
            bot_token: env::var("BOT_TOKEN").unwrap_or_default(),
            admin_id: env_i64("ADMIN_ID", 0),
            shop_id: env_i64("SHOP_ID", 0),
            shop_secret: env::var("SHOP_SECRET").unwrap_or_default(),
            acquiring_api_url: env::var("ACQUIRING_API_URL").unwrap_or_default(),
            callback_base_url: env::var("CALLBACK_BASE_URL")
                .unwrap_or_else(|_| "https://yourdomain.com".to_string()),
            crypto_payment_address: env::var("CRYPTO_PAYMENT_ADDRESS").unwrap_or_default(),
            crypto_payment_network: env::var("CRYPTO_PAYMENT_NETWORK")
                .unwrap_or_else(|_| "TRC-20".to_string()),
            crypto_exchange_rate: env::var("CRYPTO_EXCHANGE_RATE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(90.0),
            trongrid_api_key: env::var("TRONGRID_API_KEY").unwrap_or_default(),
            tron_node_url: env::var("TRON_NODE_URL")
                .unwrap_or_else(|_| "https://api.trongrid.io".to_string()),
            tariffs: demo_tariffs(),
            channels: demo_channels(),
        }
    }

    pub fn tariff(&self, tariff_id: &str) -> Option<&Tariff> {
        self.tariffs.get(tariff_id)
    }

    /// Подпись тарифа, которая хранится в платеже и подписке.
    /// Начинается с ключа тарифа: по нему сервис выдачи находит каналы.
    pub fn tariff_label(&self, tariff_id: &str, term: Term) -> Option<String> {
        self.tariffs
            .get(tariff_id)
            .map(|t| format!("{tariff_id} · {} ({})", t.name, term.label()))
    }

    /// Каналы для ключа тарифа. Ключ `all` разворачивается в объединение
    /// каналов всех остальных тарифов (без дублей).
    pub fn channels_for_tier(&self, tier: &str) -> Option<Vec<i64>> {
        if tier == "all" {
            let mut out: Vec<i64> = Vec::new();
            let mut keys: Vec<&str> = self.channels.keys().copied().collect();
            keys.sort();
            for key in keys {
                if key == "all" {
                    continue;
                }
                for id in &self.channels[key] {
                    if !out.contains(id) {
                        out.push(*id);
                    }
                }
            }
            return Some(out);
        }
        self.channels.get(tier).cloned()
    }
}

fn env_i64(key: &str, default: i64) -> i64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Первый токен тарифной подписи — ключ тарифа.
pub fn tier_of_label(label: &str) -> &str {
    label.split_whitespace().next().unwrap_or("")
}

/// «Вечные» подписки: срок «Навсегда» либо тариф на все каналы.
pub fn is_lifetime_label(label: &str) -> bool {
    label.contains("Навсегда") || tier_of_label(label) == "all"
}

// ⚠️ Демонстрационная сетка. В production ID каналов и цены приходят
// из реальной конфигурации.
fn demo_channels() -> HashMap<&'static str, Vec<i64>> {
    HashMap::from([
        ("basic_1", vec![-1]),
        ("basic_2", vec![-2]),
        ("basic_3", vec![-3]),
        ("standard_1", vec![-3, -2]),
        ("standard_2", vec![-5]),
        ("standard_3", vec![-6]),
        ("vip_1", vec![-7]),
        ("vip_2", vec![-8]),
        ("vip_3", vec![-9]),
        ("premium_1", vec![-10]),
        ("premium_2", vec![-11]),
        ("premium_3", vec![-12]),
    ])
}

fn demo_tariffs() -> HashMap<&'static str, Tariff> {
    HashMap::from([
        (
            "basic_1",
            Tariff {
                name: "Базовый 1",
                price_30_days: Some(1900.0),
                price_forever: Some(8000.0),
                description: "Описание базового тарифа 1",
            },
        ),
        (
            "basic_2",
            Tariff {
                name: "Базовый 2",
                price_30_days: Some(1990.0),
                price_forever: Some(6999.0),
                description: "Описание базового тарифа 2",
            },
        ),
        (
            "basic_3",
            Tariff {
                name: "Базовый 3",
                price_30_days: Some(1111.0),
                price_forever: Some(62222.0),
                description: "Описание базового тарифа 3",
            },
        ),
        (
            "standard_1",
            Tariff {
                name: "Стандарт 1",
                price_30_days: Some(63500.0),
                price_forever: Some(825626.0),
                description: "Описание стандартного тарифа 1",
            },
        ),
        (
            "standard_2",
            Tariff {
                name: "Стандарт 2",
                price_30_days: Some(52353.0),
                price_forever: Some(253525.0),
                description: "Описание стандартного тарифа 2",
            },
        ),
        (
            "standard_3",
            Tariff {
                name: "Стандарт 3",
                price_30_days: Some(2535.0),
                price_forever: Some(23535.0),
                description: "Описание стандартного тарифа 3",
            },
        ),
        (
            "vip_1",
            Tariff {
                name: "VIP 1",
                price_30_days: Some(25235.0),
                price_forever: Some(67235.0),
                description: "Описание VIP тарифа 1",
            },
        ),
        (
            "vip_2",
            Tariff {
                name: "VIP 2",
                price_30_days: Some(32423.0),
                price_forever: Some(234234.0),
                description: "Описание VIP тарифа 2",
            },
        ),
        (
            "vip_3",
            Tariff {
                name: "VIP 3",
                price_30_days: Some(24234.0),
                price_forever: Some(234234.0),
                description: "Описание VIP тарифа 3",
            },
        ),
        (
            "premium_1",
            Tariff {
                name: "Премиум 1",
                price_30_days: Some(234234.0),
                price_forever: Some(234324.0),
                description: "Описание премиум тарифа 1",
            },
        ),
        (
            "premium_2",
            Tariff {
                name: "Премиум 2",
                price_30_days: Some(234234.0),
                price_forever: Some(523423.0),
                description: "Описание премиум тарифа 2",
            },
        ),
        (
            "premium_3",
            Tariff {
                name: "Премиум 3",
                price_30_days: Some(234234.0),
                price_forever: Some(234234.0),
                description: "Описание премиум тарифа 3",
            },
        ),
        (
            "all",
            Tariff {
                name: "✅ ВСЕ КАНАЛЫ",
                price_30_days: None, // только навсегда
                price_forever: Some(999999.0),
                description: "Доступ ко всем каналам навсегда",
            },
        ),
    ])
}
