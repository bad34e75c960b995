use std::env;
use std::str::FromStr;
use std::time::Duration;

/// データベース接続設定を管理する構造体
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub max_connections: u32,
    /// コネクション取得の待ち時間の上限（秒）
    pub acquire_timeout_secs: u64,
    /// 行ロック待ちの上限（秒）。セッションの innodb_lock_wait_timeout に設定する
    pub lock_wait_timeout_secs: u64,
}

/// HTTPサーバーの設定
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// 設定エラー
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// 環境変数を読み取り、未設定ならデフォルト値を使う
fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// 環境変数を数値として読み取る
fn parse_var<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    var_or(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(format!("Invalid {}: {}", key, e)))
}

impl DatabaseConfig {
    /// 環境変数から設定を読み取る
    /// 環境変数が設定されていない場合はデフォルト値を使用
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: var_or("DATABASE_HOST", "localhost"),
            port: parse_var("DATABASE_PORT", "3306")?,
            database: var_or("DATABASE_NAME", "bookstore_db"),
            username: var_or("DATABASE_USER", "bookstore_user"),
            password: var_or("DATABASE_PASSWORD", "bookstore_password"),
            max_connections: parse_var("DATABASE_MAX_CONNECTIONS", "10")?,
            acquire_timeout_secs: parse_var("DATABASE_ACQUIRE_TIMEOUT_SECS", "5")?,
            lock_wait_timeout_secs: parse_var("DATABASE_LOCK_WAIT_TIMEOUT_SECS", "5")?,
        })
    }

    /// MySQL接続文字列を生成
    pub fn connection_string(&self) -> String {
        format!(
            "mysql://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }

    /// コネクション取得の待ち時間の上限
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

impl ServerConfig {
    /// 環境変数から設定を読み取る
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: var_or("SERVER_HOST", "0.0.0.0"),
            port: parse_var("SERVER_PORT", "3000")?,
        })
    }

    /// バインドするアドレス
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
