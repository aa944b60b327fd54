pub mod catalog;
pub mod comparison;
pub mod domain;
pub mod filter;
pub mod oracle;
pub mod orchestrator;
pub mod selection;

pub mod config {
    use anyhow::Context;

    #[derive(Debug, Clone, Default)]
    pub struct Settings {
        pub gemini_api_key: Option<String>,
        pub sentry_dsn: Option<String>,
        pub card_catalog_path: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                gemini_api_key: non_empty_var("GEMINI_API_KEY").or_else(|| non_empty_var("API_KEY")),
                sentry_dsn: non_empty_var("SENTRY_DSN"),
                card_catalog_path: non_empty_var("CARD_CATALOG_PATH"),
            })
        }

        pub fn require_gemini_api_key(&self) -> anyhow::Result<&str> {
            self.gemini_api_key
                .as_deref()
                .context("GEMINI_API_KEY is required")
        }
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.trim().is_empty())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn missing_api_key_is_an_error() {
            let settings = Settings::default();
            let err = settings.require_gemini_api_key().unwrap_err();
            assert!(err.to_string().contains("GEMINI_API_KEY"));

            let settings = Settings {
                gemini_api_key: Some("key".to_string()),
                ..Settings::default()
            };
            assert_eq!(settings.require_gemini_api_key().unwrap(), "key");
        }
    }
}
