use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

/// S3-compatible bucket the club cover images are pushed to.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageHostConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub public_url: String,
    pub folder: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub images: ImageHostConfig,
    pub cors_origins: Vec<String>,
    pub allow_admin_signup: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;

        let expiry = std::env::var("JWT_EXPIRY").unwrap_or_else(|_| "1d".into());
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "clubhub".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "clubhub-users".into()),
            ttl: parse_expiry(&expiry)
                .with_context(|| format!("invalid JWT_EXPIRY {expiry:?}"))?,
        };

        let endpoint = std::env::var("IMAGE_ENDPOINT").context("IMAGE_ENDPOINT is not set")?;
        let bucket = std::env::var("IMAGE_BUCKET").context("IMAGE_BUCKET is not set")?;
        let public_url = std::env::var("IMAGE_PUBLIC_URL")
            .unwrap_or_else(|_| format!("{}/{}", endpoint.trim_end_matches('/'), bucket));
        let images = ImageHostConfig {
            access_key: std::env::var("IMAGE_ACCESS_KEY").context("IMAGE_ACCESS_KEY is not set")?,
            secret_key: std::env::var("IMAGE_SECRET_KEY").context("IMAGE_SECRET_KEY is not set")?,
            region: std::env::var("IMAGE_REGION").unwrap_or_else(|_| "us-east-1".into()),
            folder: std::env::var("FOLDER_NAME").unwrap_or_else(|_| "clubs".into()),
            endpoint,
            bucket,
            public_url,
        };

        let cors_origins = parse_origins(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".into()),
        );

        Ok(Self {
            database_url,
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(10),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("APP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(4000),
            jwt,
            images,
            cors_origins,
            allow_admin_signup: std::env::var("ALLOW_ADMIN_SIGNUP")
                .map(|v| !matches!(v.trim(), "0" | "false" | "no"))
                .unwrap_or(true),
        })
    }
}

/// Upper bound on `JWT_EXPIRY`.
pub const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Parses token lifetimes such as `3600`, `90s`, `30m`, `12h` or `7d`.
pub fn parse_expiry(raw: &str) -> anyhow::Result<Duration> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);
    let amount: u64 = digits
        .parse()
        .with_context(|| format!("expected a number in {raw:?}"))?;
    let unit_secs: u64 = match unit {
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 60 * 60 * 24,
        other => anyhow::bail!("unknown duration unit {other:?}"),
    };
    let secs = amount
        .checked_mul(unit_secs)
        .with_context(|| format!("token lifetime {raw:?} overflows"))?;
    anyhow::ensure!(secs > 0, "token lifetime must be positive");
    let ttl = Duration::from_secs(secs);
    anyhow::ensure!(
        ttl <= MAX_TOKEN_LIFETIME,
        "token lifetime {raw:?} exceeds {} days",
        MAX_TOKEN_LIFETIME.as_secs() / 86_400
    );
    Ok(ttl)
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.trim_end_matches('/').to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_expiry_units() {
        assert_eq!(parse_expiry("3600").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_expiry("90s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_expiry("30m").unwrap(), Duration::from_secs(1800));
        assert_eq!(parse_expiry("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_expiry("1d").unwrap(), Duration::from_secs(86_400));
    }

    #[test]
    fn rejects_bad_expiry() {
        assert!(parse_expiry("").is_err());
        assert!(parse_expiry("1w").is_err());
        assert!(parse_expiry("h").is_err());
        assert!(parse_expiry("0").is_err());
    }

    #[test]
    fn rejects_oversized_expiry() {
        assert!(parse_expiry("100000000d").is_err());
        assert!(parse_expiry("18446744073709551615h").is_err());
        assert!(parse_expiry("366d").is_err());
        assert_eq!(parse_expiry("365d").unwrap(), MAX_TOKEN_LIFETIME);
    }

    #[test]
    fn splits_origin_list() {
        let origins = parse_origins("http://localhost:5173, https://clubs.example.com/ ,,");
        assert_eq!(
            origins,
            vec!["http://localhost:5173", "https://clubs.example.com"]
        );
    }
}
