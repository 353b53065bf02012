use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 未配置或配置为非正数时使用的默认关闭超时
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// 关闭配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShutdownConfig {
    /// 整个关闭流程的截止时间（秒），允许小数
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,
}

impl ShutdownConfig {
    /// 归一化后的关闭超时
    pub fn timeout(&self) -> Duration {
        if !self.timeout_secs.is_finite() || self.timeout_secs <= 0.0 {
            return DEFAULT_SHUTDOWN_TIMEOUT;
        }
        Duration::try_from_secs_f64(self.timeout_secs)
            .map(normalize_timeout)
            .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> f64 {
    DEFAULT_SHUTDOWN_TIMEOUT.as_secs_f64()
}

/// 零时长替换为默认超时
pub fn normalize_timeout(timeout: Duration) -> Duration {
    if timeout.is_zero() {
        DEFAULT_SHUTDOWN_TIMEOUT
    } else {
        timeout
    }
}
