use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::ConfigError;

static DATA_DIR_NAME: &str = "yatube";
static YATUBE_DB_NAME: &str = "yatube_db.sqlite";
static MEDIA_DIR_NAME: &str = "media";
static CONFIG_FILE_NAME: &str = "config.json";

/// Overrides `bind_addr` when set.
pub static BIND_ADDR_ENV: &str = "YATUBE_BIND_ADDR";

// For now this directory structure should be like
// data_dir_path
// |- yatube
//    |- yatube_db.sqlite
//    |- media/
//    |- config.json

fn default_bind_addr() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_page_size() -> u64 {
    crate::pagination::DEFAULT_PAGE_SIZE
}

fn default_index_cache_ttl_secs() -> u64 {
    20
}

fn default_max_upload_bytes() -> usize {
    20 * 1024 * 1024
}

fn default_login_url() -> String {
    "/auth/login/".to_string()
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct YatubeConfig {
    pub database_path: PathBuf,

    /// Uploaded images land under `<media_root>/posts/`.
    pub media_root: PathBuf,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Posts per feed page.
    #[serde(default = "default_page_size")]
    pub page_size: u64,

    #[serde(default = "default_index_cache_ttl_secs")]
    pub index_cache_ttl_secs: u64,

    /// Largest request body accepted by the post form, image included.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Anonymous requests to protected routes are sent here with `?next=`.
    #[serde(default = "default_login_url")]
    pub login_url: String,
}

impl YatubeConfig {
    /// Creates a config with defaults rooted at the given data directory
    pub fn new(data_dir: PathBuf) -> Self {
        YatubeConfig {
            database_path: data_dir.join(YATUBE_DB_NAME),
            media_root: data_dir.join(MEDIA_DIR_NAME),
            bind_addr: default_bind_addr(),
            page_size: default_page_size(),
            index_cache_ttl_secs: default_index_cache_ttl_secs(),
            max_upload_bytes: default_max_upload_bytes(),
            login_url: default_login_url(),
        }
    }

    pub fn index_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.index_cache_ttl_secs)
    }

    fn apply_env(mut self) -> Self {
        if let Ok(addr) = std::env::var(BIND_ADDR_ENV) {
            self.bind_addr = addr;
        }
        self
    }
}

/// Gets the existing config or initializes a new one if it doesn't exist
pub async fn get_or_init() -> Result<YatubeConfig, ConfigError> {
    let data_dir = dirs::data_dir().ok_or(ConfigError::NoDataDir)?;
    load_or_init_in(data_dir.join(DATA_DIR_NAME)).await
}

/// Same as [`get_or_init`] but rooted at an explicit directory.
pub async fn load_or_init_in(yatube_dir: PathBuf) -> Result<YatubeConfig, ConfigError> {
    let config_path = yatube_dir.join(CONFIG_FILE_NAME);

    fs::create_dir_all(&yatube_dir).await?;

    let config = if fs::try_exists(&config_path).await? {
        let mut file = fs::File::open(&config_path).await?;
        let mut contents = String::new();
        file.read_to_string(&mut contents).await?;

        serde_json::from_str::<YatubeConfig>(&contents)?
    } else {
        let config = YatubeConfig::new(yatube_dir.clone());

        let json = serde_json::to_string_pretty(&config)?;
        let mut file = fs::File::create(&config_path).await?;
        file.write_all(json.as_bytes()).await?;
        tracing::info!(path = %config_path.display(), "wrote default config");

        config
    };

    fs::create_dir_all(&config.media_root).await?;
    Ok(config.apply_env())
}
