use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::Instant;

/// 健康状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Up,
    Down,
    Unknown,
}

impl HealthStatus {
    pub fn is_up(&self) -> bool {
        matches!(self, HealthStatus::Up)
    }
}

/// 单项检查结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Check {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,
}

impl Check {
    pub fn up(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Up,
            error: None,
            data: BTreeMap::new(),
        }
    }

    pub fn down(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Down,
            error: Some(error.into()),
            data: BTreeMap::new(),
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.data.insert(key.into(), value.to_string());
        self
    }
}

/// 检查上下文，携带本轮检查的截止时间
#[derive(Debug, Clone, Copy)]
pub struct CheckContext {
    deadline: Instant,
}

impl CheckContext {
    pub fn new(deadline: Instant) -> Self {
        Self { deadline }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

/// 健康检查器
#[async_trait]
pub trait HealthChecker: Send + Sync {
    /// 检查项名称
    fn name(&self) -> &str;

    /// 执行检查
    async fn check(&self, ctx: CheckContext) -> Check;
}

type PingFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;
type PingFn = dyn Fn(CheckContext) -> PingFuture + Send + Sync;

/// 基于探测函数的检查器（数据库、缓存等连接探测）
pub struct PingChecker {
    name: String,
    ping: Box<PingFn>,
}

impl PingChecker {
    pub fn new<F, Fut>(name: impl Into<String>, ping: F) -> Self
    where
        F: Fn(CheckContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            ping: Box::new(move |ctx| Box::pin(ping(ctx)) as PingFuture),
        }
    }
}

#[async_trait]
impl HealthChecker for PingChecker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self, ctx: CheckContext) -> Check {
        match (self.ping)(ctx).await {
            Ok(()) => Check::up(&self.name),
            Err(e) => Check::down(&self.name, format!("{:#}", e)),
        }
    }
}
