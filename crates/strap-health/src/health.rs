use crate::checker::{Check, CheckContext, HealthChecker, HealthStatus};
use crate::config::{HealthConfig, DEFAULT_CHECK_TIMEOUT};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use strap_shutdown::ShutdownSignal;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{timeout_at, Instant};
use tracing::{info, warn};

/// 聚合检查结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub checks: Vec<Check>,
}

impl HealthReport {
    fn down(version: Option<String>) -> Self {
        Self {
            status: HealthStatus::Down,
            version,
            checks: Vec::new(),
        }
    }

    pub fn is_up(&self) -> bool {
        self.status.is_up()
    }

    /// 探测接口应返回的 HTTP 状态码
    pub fn status_code(&self) -> u16 {
        if self.is_up() {
            200
        } else {
            503
        }
    }
}

/// 健康检查注册表
///
/// 新建时未就绪，启动完成后由调用方 [`set_ready`](Self::set_ready)。
pub struct Health {
    version: Option<String>,
    timeout: Duration,
    checkers: RwLock<Vec<Arc<dyn HealthChecker>>>,
    ready: AtomicBool,
}

impl Health {
    pub fn new(version: Option<String>) -> Self {
        Self {
            version,
            timeout: DEFAULT_CHECK_TIMEOUT,
            checkers: RwLock::new(Vec::new()),
            ready: AtomicBool::new(false),
        }
    }

    pub fn from_config(config: &HealthConfig) -> Self {
        Self::new(config.version.clone()).with_timeout(config.check_timeout())
    }

    /// 设置单次检查超时，零值使用默认值
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = if timeout.is_zero() {
            DEFAULT_CHECK_TIMEOUT
        } else {
            timeout
        };
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn register(&self, checker: Arc<dyn HealthChecker>) {
        self.checkers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(checker);
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// 并发执行所有检查，任一项非 UP 则整体 DOWN
    ///
    /// 超时或 panic 的检查记为 DOWN，结果按注册顺序排列。
    pub async fn check(&self) -> HealthReport {
        let checkers = self
            .checkers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let deadline = Instant::now()
            .checked_add(self.timeout)
            .unwrap_or_else(|| Instant::now() + DEFAULT_CHECK_TIMEOUT);
        let ctx = CheckContext::new(deadline);

        let mut tasks = JoinSet::new();
        for (index, checker) in checkers.iter().enumerate() {
            let checker = checker.clone();
            tasks.spawn(async move {
                let name = checker.name().to_string();
                let check = match timeout_at(deadline, checker.check(ctx)).await {
                    Ok(check) => check,
                    Err(_) => Check::down(name, "check timed out"),
                };
                (index, check)
            });
        }

        let mut slots: Vec<Option<Check>> = vec![None; checkers.len()];
        while let Some(joined) = tasks.join_next().await {
            if let Ok((index, check)) = joined {
                slots[index] = Some(check);
            }
        }

        let checks: Vec<Check> = slots
            .into_iter()
            .zip(checkers.iter())
            .map(|(slot, checker)| {
                slot.unwrap_or_else(|| Check::down(checker.name(), "check panicked"))
            })
            .collect();

        let status = if checks.iter().all(|c| c.status.is_up()) {
            HealthStatus::Up
        } else {
            HealthStatus::Down
        };
        for check in checks.iter().filter(|c| !c.status.is_up()) {
            warn!(
                check = %check.name,
                error = check.error.as_deref().unwrap_or(""),
                "health check failed"
            );
        }

        HealthReport {
            status,
            version: self.version.clone(),
            checks,
        }
    }

    /// 存活探测
    pub async fn liveness(&self) -> HealthReport {
        self.check().await
    }

    /// 就绪探测：未就绪时直接 DOWN，不执行检查
    pub async fn readiness(&self) -> HealthReport {
        if !self.is_ready() {
            return HealthReport::down(self.version.clone());
        }
        self.check().await
    }

    /// 启动探测：只看就绪标志
    pub fn startup(&self) -> HealthReport {
        if self.is_ready() {
            HealthReport {
                status: HealthStatus::Up,
                version: self.version.clone(),
                checks: Vec::new(),
            }
        } else {
            HealthReport::down(self.version.clone())
        }
    }

    /// 关闭开始时撤销就绪状态
    ///
    /// `shutdown` 通常来自 `ShutdownCoordinator::subscribe()`。
    pub fn withdraw_on_shutdown(
        self: &Arc<Self>,
        mut shutdown: watch::Receiver<Option<ShutdownSignal>>,
    ) -> JoinHandle<()> {
        let health = self.clone();
        tokio::spawn(async move {
            let signal = shutdown.wait_for(Option::is_some).await.map(|s| *s);
            if let Ok(Some(signal)) = signal {
                health.set_ready(false);
                info!(signal = %signal, "readiness withdrawn");
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::PingChecker;
    use anyhow::anyhow;

    #[tokio::test]
    async fn test_empty_health_is_up() {
        let health = Health::new(Some("1.0.0".to_string()));
        let report = health.check().await;

        assert!(report.is_up());
        assert_eq!(report.version.as_deref(), Some("1.0.0"));
        assert!(report.checks.is_empty());
    }

    #[tokio::test]
    async fn test_readiness_follows_flag() {
        let health = Health::new(None);
        assert!(!health.is_ready());
        assert_eq!(health.readiness().await.status_code(), 503);
        assert_eq!(health.startup().status, HealthStatus::Down);

        health.set_ready(true);
        assert_eq!(health.readiness().await.status_code(), 200);
        assert!(health.startup().is_up());
    }

    #[tokio::test]
    async fn test_failing_check_marks_report_down() {
        let health = Health::new(None);
        health.register(Arc::new(PingChecker::new("postgres", |_ctx| async { Ok(()) })));
        health.register(Arc::new(PingChecker::new("redis", |_ctx| async {
            Err(anyhow!("connection refused"))
        })));

        let report = health.check().await;
        assert_eq!(report.status, HealthStatus::Down);
        assert_eq!(report.checks.len(), 2);
        assert_eq!(report.checks[0], Check::up("postgres"));
        assert_eq!(report.checks[1].error.as_deref(), Some("connection refused"));
    }

    #[test]
    fn test_zero_timeout_uses_default() {
        let health = Health::new(None).with_timeout(Duration::ZERO);
        assert_eq!(health.timeout(), DEFAULT_CHECK_TIMEOUT);
    }
}
