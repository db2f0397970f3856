//! Runtime configuration.

/// Local file-backed store used when `DATABASE_URL` is unset.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://hospital.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database_url: String,
}

impl Settings {
    /// Reads settings from the process environment, after loading `.env` if present.
    pub fn from_env() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        Self { database_url }
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = url.into();
        self
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_local_sqlite_file() {
        let settings = Settings::from_lookup(|_| None);
        assert_eq!(settings.database_url, DEFAULT_DATABASE_URL);
    }

    #[test]
    fn test_blank_url_falls_back_to_default() {
        let settings = Settings::from_lookup(|_| Some("  ".to_string()));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_reads_database_url() {
        let settings = Settings::from_lookup(|key| {
            (key == "DATABASE_URL").then(|| "sqlite://records.db".to_string())
        });
        assert_eq!(settings.database_url, "sqlite://records.db");
    }

    #[test]
    fn test_explicit_url_overrides() {
        let settings = Settings::default().with_database_url("sqlite::memory:");
        assert_eq!(settings.database_url, "sqlite::memory:");
    }
}
