use crate::config::{LogFormat, LoggingConfig};
use std::path::Path;
use thiserror::Error;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log level {level}: {message}")]
    InvalidLevel { level: String, message: String },

    #[error("Invalid log file path: {0}")]
    InvalidPath(String),

    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to initialize logging: {0}")]
    Init(String),
}

/// 文件日志的后台写线程守卫，drop 时刷新缓冲区
#[derive(Default)]
pub struct LoggingGuard {
    file: Option<WorkerGuard>,
}

impl std::fmt::Debug for LoggingGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggingGuard")
            .field("file", &self.file.is_some())
            .finish()
    }
}

impl LoggingGuard {
    pub fn has_file(&self) -> bool {
        self.file.is_some()
    }

    /// 刷新并关闭文件日志
    pub fn flush(self) {
        drop(self);
    }
}

/// 构建日志过滤器，`RUST_LOG` 优先于配置
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, LoggingError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => parse_filter(&config.level),
    }
}

/// 解析 `EnvFilter` 语法的日志级别
pub fn parse_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(level).map_err(|e| LoggingError::InvalidLevel {
        level: level.to_string(),
        message: e.to_string(),
    })
}

/// 初始化全局日志
///
/// 控制台按 `format` 输出；配置了 `file` 时额外写入按天滚动的 JSON 文件。
/// 返回的守卫需要保持到进程退出前。
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard, LoggingError> {
    let filter = build_filter(config)?;

    let pretty = (config.format == LogFormat::Pretty).then(|| fmt::layer().with_target(true));
    let json = (config.format == LogFormat::Json).then(|| fmt::layer().json());

    let (file_layer, guard) = match &config.file {
        Some(path) => {
            let (writer, guard) = file_writer(path)?;
            let layer = fmt::layer().json().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    Ok(LoggingGuard { file: guard })
}

fn file_writer(path: &Path) -> Result<(NonBlocking, WorkerGuard), LoggingError> {
    let file_name = path
        .file_name()
        .ok_or_else(|| LoggingError::InvalidPath(path.display().to_string()))?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    std::fs::create_dir_all(dir)?;

    let appender = tracing_appender::rolling::daily(dir, file_name);
    Ok(tracing_appender::non_blocking(appender))
}
