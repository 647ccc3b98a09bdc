use std::env;

/// Application configuration loaded from environment variables. Every
/// variable is optional with a default; an empty validator key disables
/// semantic validation and semantic dedup.
#[derive(Debug, Clone)]
pub struct Config {
    // Semantic validator
    pub validator_api_key: String,

    // Pipeline tuning
    pub batch_concurrency: usize,
    pub similarity_threshold: f32,

    // Persistence
    pub cache_path: String,
    pub output_path: String,
}

impl Config {
    /// Load configuration from environment variables. Panics with a clear
    /// message when a numeric variable does not parse.
    pub fn from_env() -> Self {
        Self {
            validator_api_key: env::var("VALIDATOR_API_KEY").unwrap_or_default(),
            batch_concurrency: env::var("BATCH_CONCURRENCY")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .expect("BATCH_CONCURRENCY must be a number"),
            similarity_threshold: env::var("SIMILARITY_THRESHOLD")
                .unwrap_or_else(|_| "0.8".to_string())
                .parse()
                .expect("SIMILARITY_THRESHOLD must be a number"),
            cache_path: env::var("CACHE_PATH")
                .unwrap_or_else(|_| "data/processed-cache.json".to_string()),
            output_path: env::var("OUTPUT_PATH")
                .unwrap_or_else(|_| "data/cases.json".to_string()),
        }
    }

    /// Semantic validation is active only when an oracle key is configured.
    pub fn semantic_validation_enabled(&self) -> bool {
        !self.validator_api_key.is_empty()
    }
}
