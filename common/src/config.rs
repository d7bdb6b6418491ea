//! Environment configuration: direct `std::env::var` reads with inline
//! defaults, no struct-tag crate.

use crate::retry::RetryConfig;
use std::time::Duration;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[derive(Debug, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
    pub group_id: String,
    pub subscriber_topics: Vec<String>,
    pub publish_topics: Vec<String>,
}

impl KafkaConfig {
    pub fn from_env(group_id_var: &str, group_id_default: &str) -> Self {
        let brokers = env_or("KAFKA_BROKERS", "localhost:9092");
        let group_id = env_or(group_id_var, group_id_default);
        let subscriber_topics = split_csv(&env_or("KAFKA_SUBSCRIBER_TOPICS", ""));
        let publish_topics = split_csv(&env_or("KAFKA_PUBLISH_TOPICS", ""));

        Self {
            brokers,
            group_id,
            subscriber_topics,
            publish_topics,
        }
    }
}

fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

impl RetryConfig {
    pub fn from_env() -> Self {
        Self {
            max_attempts: env_parse_or("KAFKA_RETRY_MAX_ATTEMPTS", 5),
            base_delay: Duration::from_millis(env_parse_or("KAFKA_RETRY_BASE_DELAY", 100)),
            max_delay: Duration::from_millis(env_parse_or("KAFKA_RETRY_MAX_DELAY", 10_000)),
            jitter: env_parse_or("KAFKA_RETRY_JITTER", true),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub name: String,
    pub port: String,
    pub sslmode: String,
}

impl DbConfig {
    pub fn from_env() -> Self {
        Self {
            host: env_or("DB_HOST", "localhost"),
            user: env_or("DB_USER", "postgres"),
            password: env_or("DB_PASSWORD", "postgres"),
            name: env_or("DB_NAME", "payments_db"),
            port: env_or("DB_PORT", "5432"),
            sslmode: env_or("DB_SSLMODE", "disable"),
        }
    }

    pub fn url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            self.user, self.password, self.host, self.port, self.name, self.sslmode
        )
    }
}

pub fn app_port(default: &str) -> u16 {
    env_parse_or("APP_PORT", default.parse().unwrap())
}

pub fn is_local_env() -> bool {
    env_or("GO_ENV", "").eq_ignore_ascii_case("local")
}

pub fn load_dotenv() {
    if is_local_env() {
        dotenvy::dotenv().ok();
    }
}
