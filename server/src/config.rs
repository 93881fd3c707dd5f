use anyhow::{Context, Result};
use platform_db::DatabaseSettings;
use products_hr::repository::DEFAULT_LIST_LIMIT;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseSettings,
    pub cors_allowed_origins: Vec<String>,
    pub default_page_limit: u64,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let database = DatabaseSettings::from_env().context("invalid database settings")?;

        let cors_allowed_origins = parse_origins(
            &std::env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:5173".into()),
        );

        let default_page_limit = match std::env::var("DEFAULT_PAGE_LIMIT") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("invalid DEFAULT_PAGE_LIMIT {raw:?}"))?,
            Err(_) => DEFAULT_LIST_LIMIT,
        };

        Ok(Self {
            database,
            cors_allowed_origins,
            default_page_limit,
        })
    }

    #[cfg(test)]
    pub fn for_database(database: DatabaseSettings) -> Self {
        Self {
            database,
            cors_allowed_origins: Vec::new(),
            default_page_limit: DEFAULT_LIST_LIMIT,
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_trimmed_and_blank_entries_dropped() {
        assert_eq!(
            parse_origins(" http://a.test , ,http://b.test,"),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
        assert!(parse_origins("").is_empty());
    }
}
