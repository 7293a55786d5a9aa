use std::env;

use anyhow::Context;

use crate::pricing::PricingPolicy;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_days: i64,
    pub pricing: PricingPolicy,
    pub cors_allowed_origin: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env_or("APP_PORT", 3000);

        let defaults = PricingPolicy::default();
        let pricing = PricingPolicy {
            tax_rate_bps: env_or("TAX_RATE_BPS", defaults.tax_rate_bps),
            free_shipping_threshold: env_or(
                "FREE_SHIPPING_THRESHOLD",
                defaults.free_shipping_threshold,
            ),
            flat_shipping_fee: env_or("FLAT_SHIPPING_FEE", defaults.flat_shipping_fee),
        };

        let cors_allowed_origin = env::var("CORS_ALLOWED_ORIGIN")
            .ok()
            .filter(|origin| !origin.trim().is_empty());

        Ok(Self {
            database_url,
            host,
            port,
            jwt_secret,
            access_token_ttl_minutes: env_or("ACCESS_TOKEN_TTL_MINUTES", 30),
            refresh_token_ttl_days: env_or("REFRESH_TOKEN_TTL_DAYS", 7),
            pricing,
            cors_allowed_origin,
        })
    }
}

/// Reads and parses an env var, falling back to `default` when unset or malformed.
fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::env_or;

    #[test]
    fn env_or_falls_back_for_missing_keys() {
        assert_eq!(env_or("AWE_STORE_SURELY_UNSET_KEY", 42_u16), 42);
    }
}
