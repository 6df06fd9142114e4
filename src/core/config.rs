use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Filesystem layout for persistent data (metric db, embedding index, logs).
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub db_path: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let data_dir = discover_data_dir();
        let log_dir = data_dir.join("logs");
        let db_path = data_dir.join("esg_core.db");

        for dir in [&data_dir, &log_dir] {
            let _ = fs::create_dir_all(dir);
        }

        AppPaths {
            data_dir,
            log_dir,
            db_path,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn discover_data_dir() -> PathBuf {
    if let Ok(dir) = env::var("ESG_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if cfg!(debug_assertions) {
        return env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    }

    let xdg = env::var("XDG_DATA_HOME").unwrap_or_else(|_| {
        home_dir().join(".local/share").to_string_lossy().to_string()
    });
    PathBuf::from(xdg).join("esg-assistant")
}

fn home_dir() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Generative model connection and sampling parameters.
#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub embedding_model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub top_k: u32,
    pub request_timeout: Duration,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.together.xyz".to_string(),
            api_key: String::new(),
            model: "mistralai/Mixtral-8x7B-Instruct-v0.1".to_string(),
            embedding_model: "togethercomputer/m2-bert-80M-8k-retrieval".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
            top_k: 50,
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// Conversation engine tuning: retry budget, backoff, deadline, history window.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub deadline: Duration,
    pub history_limit: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_millis(500),
            deadline: Duration::from_secs(45),
            history_limit: 20,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub paths: AppPaths,
    pub model: ModelSettings,
    pub engine: EngineSettings,
    pub default_company: String,
    pub seed_path: Option<PathBuf>,
    pub allowed_origins: Vec<String>,
}

impl Settings {
    /// Resolve settings from the environment, falling back to defaults that
    /// match the reference deployment.
    pub fn from_env() -> Self {
        let port = env_parse("ESG_PORT", 8000u16);
        let paths = AppPaths::new();

        let model = ModelSettings {
            base_url: env_string("ESG_TOGETHER_BASE_URL", "https://api.together.xyz"),
            api_key: env::var("TOGETHER_API_KEY").unwrap_or_default(),
            model: env_string("ESG_MODEL", "mistralai/Mixtral-8x7B-Instruct-v0.1"),
            embedding_model: env_string(
                "ESG_EMBEDDING_MODEL",
                "togethercomputer/m2-bert-80M-8k-retrieval",
            ),
            temperature: env_parse("ESG_TEMPERATURE", 0.7f64),
            max_tokens: env_parse("ESG_MAX_TOKENS", 1024u32),
            top_k: env_parse("ESG_TOP_K", 50u32),
            request_timeout: Duration::from_secs(env_parse("ESG_REQUEST_TIMEOUT_SECS", 60u64)),
        };

        let engine = EngineSettings {
            max_attempts: env_parse("ESG_MAX_ATTEMPTS", 3u32),
            backoff_base: Duration::from_millis(env_parse("ESG_BACKOFF_MS", 500u64)),
            deadline: Duration::from_secs(env_parse("ESG_DEADLINE_SECS", 45u64)),
            history_limit: env_parse("ESG_HISTORY_LIMIT", 20usize),
        };

        let seed_path = env::var("ESG_SEED_PATH").ok().map(PathBuf::from);

        let allowed_origins = env::var("ESG_ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Settings {
            port,
            paths,
            model,
            engine,
            default_company: env_string("ESG_DEFAULT_COMPANY", "NVIDIA Corporation"),
            seed_path,
            allowed_origins,
        }
    }
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|val| val.parse::<T>().ok())
        .unwrap_or(default)
}
