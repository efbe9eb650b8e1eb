use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub ttl_minutes: i64,
}

/// Field-length bounds enforced by the form validators.
#[derive(Debug, Clone, Deserialize)]
pub struct Limits {
    pub title_max: usize,
    pub description_max: usize,
    pub link_max: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub session: SessionConfig,
    pub limits: Limits,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let session = SessionConfig {
            cookie_name: std::env::var("SESSION_COOKIE_NAME")
                .unwrap_or_else(|_| "folio_session".into()),
            ttl_minutes: std::env::var("SESSION_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24),
        };
        let limits = Limits {
            title_max: 100,
            // Deployments with longer project blurbs can raise this.
            description_max: std::env::var("PROJECT_DESCRIPTION_MAX")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(255),
            link_max: 100,
        };
        Ok(Self {
            database_url,
            session,
            limits,
        })
    }
}
