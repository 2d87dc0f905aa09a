use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    /// Bearer token lifetime in hours.
    pub jwt_expires_hours: i64,
    /// Directory where eligibility documents are stored.
    pub upload_dir: String,
    /// When set, registration and login are restricted to addresses under
    /// this domain (e.g. "amfi.finance").
    pub allowed_email_domain: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable required"))
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("DATABASE_URL cannot be empty");
                    }
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DATABASE_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            jwt_secret: std::env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable required"))
                .and_then(|secret| {
                    if secret.trim().len() < 16 {
                        anyhow::bail!("JWT_SECRET must be at least 16 characters");
                    }
                    Ok(secret)
                })?,
            jwt_expires_hours: std::env::var("JWT_EXPIRES_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("JWT_EXPIRES_HOURS must be a positive number"))
                .and_then(|hours: i64| {
                    if hours <= 0 {
                        anyhow::bail!("JWT_EXPIRES_HOURS must be a positive number");
                    }
                    Ok(hours)
                })?,
            upload_dir: std::env::var("UPLOAD_DIR")
                .unwrap_or_else(|_| "uploads".to_string()),
            allowed_email_domain: std::env::var("ALLOWED_EMAIL_DOMAIN")
                .ok()
                .map(|d| d.trim().trim_start_matches('@').to_string())
                .filter(|d| !d.is_empty()),
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!(
            "Database URL: {}...",
            &config.database_url[..20.min(config.database_url.len())]
        );
        tracing::debug!("Server Port: {}", config.port);
        tracing::debug!("Upload dir: {}", config.upload_dir);
        if let Some(ref domain) = config.allowed_email_domain {
            tracing::info!("Registration restricted to e-mail domain: {}", domain);
        }

        Ok(config)
    }
}
