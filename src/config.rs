use serde::Deserialize;

pub const DEFAULT_MODEL: &str = "gemini-3-pro-preview";

#[derive(Debug, Clone, Deserialize)]
pub struct InferenceConfig {
    /// Credential slots in priority order; empty/placeholder entries are
    /// filtered when the pool is built, not here.
    pub api_keys: Vec<String>,
    pub model: String,
    pub max_attempts_per_credential: u32,
    pub base_delay_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub inference: InferenceConfig,
    pub history: HistoryConfig,
    pub identity_file: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let api_keys = vec![
            std::env::var("GEMINI_API_KEY").unwrap_or_default(),
            std::env::var("GEMINI_API_KEY_SECONDARY").unwrap_or_default(),
            std::env::var("GEMINI_API_KEY_TERTIARY").unwrap_or_default(),
        ];
        let inference = InferenceConfig {
            api_keys,
            model: std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into()),
            max_attempts_per_credential: std::env::var("GEMINI_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(4),
            base_delay_secs: std::env::var("GEMINI_BASE_DELAY_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(2),
        };
        let history = HistoryConfig {
            supabase_url: std::env::var("SUPABASE_URL")?,
            supabase_anon_key: std::env::var("SUPABASE_ANON_KEY")?,
        };
        let identity_file =
            std::env::var("IDENTITY_FILE").unwrap_or_else(|_| ".nutriai_user".into());
        Ok(Self {
            inference,
            history,
            identity_file,
        })
    }
}
