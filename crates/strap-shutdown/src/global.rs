//! 进程级共享协调器
//!
//! 第一次调用 [`setup`] 创建共享实例，之后的调用（参数不同也一样）都返回同一个
//! 实例。便捷函数在未初始化时静默忽略；需要显式错误时使用 `try_*` 版本。

use crate::coordinator::ShutdownCoordinator;
use crate::error::ShutdownError;
use crate::logger::{field, ShutdownLogger};
use crate::operation::{Teardown, TeardownContext};
use crate::report::ShutdownReport;
use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

static DEFAULT: OnceLock<Arc<ShutdownCoordinator>> = OnceLock::new();

/// 初始化共享协调器，只有第一次调用生效
pub fn setup(timeout: Duration, logger: Arc<dyn ShutdownLogger>) -> Arc<ShutdownCoordinator> {
    DEFAULT
        .get_or_init(|| Arc::new(ShutdownCoordinator::new(timeout, logger)))
        .clone()
}

pub fn global() -> Option<Arc<ShutdownCoordinator>> {
    DEFAULT.get().cloned()
}

pub fn register<F, Fut>(func: F)
where
    F: Fn(TeardownContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    if let Some(coordinator) = DEFAULT.get() {
        coordinator.register(func);
    }
}

pub fn register_named<F, Fut>(name: impl Into<String>, func: F)
where
    F: Fn(TeardownContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    if let Some(coordinator) = DEFAULT.get() {
        coordinator.register_named(name, func);
    }
}

pub fn register_resource(resource: Arc<dyn Teardown>) {
    if let Some(coordinator) = DEFAULT.get() {
        coordinator.register_resource(resource);
    }
}

/// 等待终止信号并执行关闭；错误已通过协调器的日志输出
pub async fn wait() {
    let Some(coordinator) = global() else {
        return;
    };
    match coordinator.wait().await {
        Ok(_) | Err(ShutdownError::AlreadyStarted) => {}
        Err(e) => coordinator
            .logger()
            .error("shutdown wait failed", &[field("error", e)]),
    }
}

pub fn try_register<F, Fut>(func: F) -> Result<(), ShutdownError>
where
    F: Fn(TeardownContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    let coordinator = DEFAULT.get().ok_or(ShutdownError::NotInitialized)?;
    coordinator.register(func);
    Ok(())
}

pub async fn try_wait() -> Result<ShutdownReport, ShutdownError> {
    let coordinator = global().ok_or(ShutdownError::NotInitialized)?;
    coordinator.wait().await
}
