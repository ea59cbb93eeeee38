use std::env;
use std::str::FromStr;

/// 設定エラー
#[derive(Debug)]
pub enum ConfigError {
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

fn string_var(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parsed_var<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(format!("Invalid {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

/// データベース接続設定
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// 環境変数から設定を読み取る
    /// 環境変数が設定されていない場合はデフォルト値を使用
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: string_var("DATABASE_HOST", "localhost"),
            port: parsed_var("DATABASE_PORT", 3306)?,
            database: string_var("DATABASE_NAME", "fitness_studio"),
            username: string_var("DATABASE_USER", "fitness"),
            password: string_var("DATABASE_PASSWORD", "fitness_password"),
            max_connections: parsed_var("DATABASE_MAX_CONNECTIONS", 10)?,
        })
    }

    /// MySQL接続文字列を生成
    pub fn connection_string(&self) -> String {
        format!(
            "mysql://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }
}

/// 予約データの保存先
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    MySql,
    /// プロセス内メモリ（開発・デモ用、再起動で消える）
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mysql" => Ok(StorageBackend::MySql),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown storage backend '{}'", other)),
        }
    }
}

/// アプリケーション設定
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// 確認リンクに使う公開URL（末尾のスラッシュなし）
    pub public_base_url: String,
    pub storage: StorageBackend,
    /// tracing-subscriberのEnvFilter書式
    pub log_filter: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let public_base_url = string_var("APP_PUBLIC_BASE_URL", "http://localhost:3000")
            .trim_end_matches('/')
            .to_string();
        if public_base_url.is_empty() {
            return Err(ConfigError::InvalidValue(
                "APP_PUBLIC_BASE_URL must not be empty".to_string(),
            ));
        }

        Ok(Self {
            port: parsed_var("APP_PORT", 3000)?,
            public_base_url,
            storage: parsed_var("APP_STORAGE", StorageBackend::MySql)?,
            log_filter: string_var("APP_LOG_FILTER", "info"),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}
