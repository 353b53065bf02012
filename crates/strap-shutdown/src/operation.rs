use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

pub type TeardownFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;

type TeardownFn = dyn Fn(TeardownContext) -> TeardownFuture + Send + Sync;

/// 溢出时使用的远期截止时间（约 30 年）
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// 计算截止时间，超大时长（如 `Duration::MAX`）不会溢出
pub(crate) fn deadline_after(start: Instant, timeout: Duration) -> Instant {
    start
        .checked_add(timeout)
        .unwrap_or_else(|| start + FAR_FUTURE)
}

/// 关闭操作的上下文
///
/// 同一次关闭流程中的所有操作共享同一个上下文：截止时间到达或协调器
/// 结束等待时即视为取消。操作应当观察取消并尽快返回，协调器不会强制终止
/// 仍在运行的操作。
#[derive(Debug, Clone)]
pub struct TeardownContext {
    token: CancellationToken,
    deadline: Instant,
}

impl TeardownContext {
    pub fn new(deadline: Instant) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new(deadline_after(Instant::now(), timeout))
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// 距离截止时间的剩余时长
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || Instant::now() >= self.deadline
    }

    /// 等待取消（显式取消或截止时间到达）
    pub async fn cancelled(&self) {
        tokio::select! {
            _ = self.token.cancelled() => {}
            _ = sleep_until(self.deadline) => {}
        }
    }

    /// 派生子令牌，供只接受 `CancellationToken` 的子系统使用
    pub fn token(&self) -> CancellationToken {
        self.token.child_token()
    }

    pub(crate) fn cancel(&self) {
        self.token.cancel();
    }
}

/// 已注册的关闭操作
///
/// 克隆只复制名称和函数指针，注册表快照因此是一份廉价的拷贝。
#[derive(Clone)]
pub struct TeardownOperation {
    name: Option<String>,
    func: Arc<TeardownFn>,
}

impl TeardownOperation {
    pub fn new<F, Fut>(func: F) -> Self
    where
        F: Fn(TeardownContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            name: None,
            func: Arc::new(move |ctx: TeardownContext| Box::pin(func(ctx)) as TeardownFuture),
        }
    }

    pub fn named<F, Fut>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(TeardownContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            name: Some(name.into()),
            ..Self::new(func)
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn run(&self, ctx: TeardownContext) -> TeardownFuture {
        (self.func)(ctx)
    }
}

impl fmt::Debug for TeardownOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TeardownOperation")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// 需要在关闭时释放的资源
#[async_trait]
pub trait Teardown: Send + Sync {
    /// 资源名称
    fn name(&self) -> &str;

    /// 释放资源
    async fn teardown(&self, ctx: TeardownContext) -> anyhow::Result<()>;
}
