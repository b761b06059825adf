pub mod aggregate;
pub mod domain;
pub mod storage;

pub mod config {
    use anyhow::Context;

    const DEFAULT_PORT: u16 = 3000;
    const DEFAULT_STATIC_DIR: &str = "public";
    const DEFAULT_STORE_TIMEOUT_SECS: u64 = 30;
    const DEFAULT_SURVEYS_TABLE: &str = "surveys";

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub supabase_url: Option<String>,
        pub supabase_service_role_key: Option<String>,
        pub sentry_dsn: Option<String>,
        pub port: u16,
        pub static_dir: String,
        pub store_timeout_secs: u64,
        pub surveys_table: String,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Self::from_vars(|key| std::env::var(key).ok())
        }

        pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
            let non_empty = |key: &str| var(key).filter(|s| !s.trim().is_empty());

            Ok(Self {
                supabase_url: non_empty("SUPABASE_URL"),
                supabase_service_role_key: non_empty("SUPABASE_SERVICE_ROLE_KEY"),
                sentry_dsn: non_empty("SENTRY_DSN"),
                port: var("PORT")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_PORT),
                static_dir: non_empty("STATIC_DIR")
                    .unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string()),
                store_timeout_secs: var("STORE_TIMEOUT_SECS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_STORE_TIMEOUT_SECS),
                surveys_table: non_empty("SURVEYS_TABLE")
                    .unwrap_or_else(|| DEFAULT_SURVEYS_TABLE.to_string()),
            })
        }

        pub fn require_supabase_url(&self) -> anyhow::Result<&str> {
            self.supabase_url
                .as_deref()
                .context("SUPABASE_URL is required")
        }

        pub fn require_supabase_service_role_key(&self) -> anyhow::Result<&str> {
            self.supabase_service_role_key
                .as_deref()
                .context("SUPABASE_SERVICE_ROLE_KEY is required")
        }
    }

}
