use std::env;

use crate::utils::email::DEFAULT_CODE_LENGTH;

/// Runtime configuration, read once at startup. Only `DATABASE_URL` is
/// mandatory; everything else has a development default.
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    /// Base URL embedded into verification links.
    pub site_url: String,
    pub email_from: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub verify_code_length: usize,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_owned())
}

impl Config {
    pub fn from_env() -> Config {
        Config {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            bind_address: var_or("BIND_ADDRESS", "127.0.0.1:8088"),
            site_url: var_or("SITE_URL", "http://127.0.0.1:8088"),
            email_from: var_or("EMAIL_FROM", "Lighten <noreply@localhost>"),
            smtp_host: var_or("SMTP_HOST", "127.0.0.1"),
            smtp_port: var_or("SMTP_PORT", "25")
                .parse()
                .expect("SMTP_PORT must be a port number"),
            smtp_username: env::var("SMTP_USERNAME").ok(),
            smtp_password: env::var("SMTP_PASSWORD").ok(),
            verify_code_length: match env::var("VERIFY_CODE_LENGTH") {
                Ok(raw) => raw.parse().expect("VERIFY_CODE_LENGTH must be a number"),
                Err(_) => DEFAULT_CODE_LENGTH,
            },
        }
    }
}
