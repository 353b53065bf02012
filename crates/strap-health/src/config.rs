use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 单个检查的默认超时
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// 健康检查配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthConfig {
    /// 报告中携带的版本号
    #[serde(default)]
    pub version: Option<String>,

    #[serde(default = "default_check_timeout_ms")]
    pub check_timeout_ms: u64,
}

fn default_check_timeout_ms() -> u64 {
    DEFAULT_CHECK_TIMEOUT.as_millis() as u64
}

impl HealthConfig {
    /// 零值使用默认超时
    pub fn check_timeout(&self) -> Duration {
        if self.check_timeout_ms == 0 {
            DEFAULT_CHECK_TIMEOUT
        } else {
            Duration::from_millis(self.check_timeout_ms)
        }
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            version: None,
            check_timeout_ms: default_check_timeout_ms(),
        }
    }
}
