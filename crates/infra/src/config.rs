//! Environment-based configuration.
//!
//! Variables read by [`Config::from_env`]:
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `HOST` | `0.0.0.0` | HTTP bind address |
//! | `PORT` | `8080` | HTTP port |
//! | `DATABASE_URL` | — | Postgres URL; in-memory store when unset |
//! | `REDIS_URL` | — | Redis URL; in-memory queue when unset |
//! | `REDIS_QUEUE_KEY` | `certmill:jobs` | Queue list key |
//! | `SMTP_HOST` | `localhost` | SMTP relay host |
//! | `SMTP_PORT` | `587` | SMTP relay port |
//! | `SMTP_USER` / `SMTP_PASSWORD` | — | Relay credentials |
//! | `SMTP_FROM` | `no-reply@localhost` | Sender address |
//! | `SMTP_FROM_NAME` | `` | Sender display name |
//! | `SMTP_TLS` | `starttls` | `starttls`, `tls` or `none` |
//! | `STORAGE_ROOT` | `./storage/certificates` | Artifact directory |
//! | `TEMPLATES_DIR` | `./templates/certificates` | HTML template directory |
//! | `WORKER_COUNT` | `4` | Worker pool size |
//! | `CLAIM_TIMEOUT_SECS` | `5` | Blocking claim timeout |

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database_url: Option<String>,
    pub redis: RedisConfig,
    pub email: EmailConfig,
    pub storage: StorageConfig,
    pub render: RenderConfig,
    pub workers: WorkerConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: Option<String>,
    pub queue_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpTls {
    Starttls,
    Tls,
    None,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    pub from_email: String,
    pub from_name: String,
    pub tls: SmtpTls,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub root: PathBuf,
}

#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub templates_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub count: usize,
    pub claim_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                host: env_or("HOST", "0.0.0.0"),
                port: env_parse("PORT", 8080),
            },
            database_url: env_opt("DATABASE_URL"),
            redis: RedisConfig {
                url: env_opt("REDIS_URL"),
                queue_key: env_or("REDIS_QUEUE_KEY", "certmill:jobs"),
            },
            email: EmailConfig {
                smtp_host: env_or("SMTP_HOST", "localhost"),
                smtp_port: env_parse("SMTP_PORT", 587),
                smtp_user: env_opt("SMTP_USER"),
                smtp_password: env_opt("SMTP_PASSWORD"),
                from_email: env_or("SMTP_FROM", "no-reply@localhost"),
                from_name: env_or("SMTP_FROM_NAME", ""),
                tls: match env_or("SMTP_TLS", "starttls").as_str() {
                    "tls" => SmtpTls::Tls,
                    "none" => SmtpTls::None,
                    _ => SmtpTls::Starttls,
                },
            },
            storage: StorageConfig {
                root: PathBuf::from(env_or("STORAGE_ROOT", "./storage/certificates")),
            },
            render: RenderConfig {
                templates_dir: PathBuf::from(env_or("TEMPLATES_DIR", "./templates/certificates")),
            },
            workers: WorkerConfig {
                count: env_parse("WORKER_COUNT", 4),
                claim_timeout: Duration::from_secs(env_parse("CLAIM_TIMEOUT_SECS", 5)),
            },
        }
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

fn env_parse<T: core::str::FromStr + Copy>(key: &str, default: T) -> T {
    match env_opt(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(var = key, value = %raw, "unparsable value; using default");
            default
        }),
        None => default,
    }
}
