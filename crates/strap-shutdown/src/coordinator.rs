use crate::config::{normalize_timeout, ShutdownConfig, DEFAULT_SHUTDOWN_TIMEOUT};
use crate::error::ShutdownError;
use crate::logger::{field, ShutdownLogger, TracingLogger};
use crate::operation::{deadline_after, Teardown, TeardownContext, TeardownOperation};
use crate::registry::Registry;
use crate::report::{ShutdownOutcome, ShutdownReport, TeardownFailure};
use crate::signal::{ShutdownSignal, SignalHandler};
use anyhow::anyhow;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{timeout_at, Instant};

/// 单个关闭任务的结果
struct TaskOutcome {
    name: Option<String>,
    result: anyhow::Result<()>,
}

/// 关闭协调器
///
/// 启动阶段由各子系统注册关闭操作；触发关闭后，注册表快照中的操作按
/// 逆注册顺序依次启动、并发执行。逆序只决定启动顺序，不保证完成顺序，
/// 操作之间不能相互依赖。
pub struct ShutdownCoordinator {
    timeout: Duration,
    registry: Registry,
    signal_handler: SignalHandler,
    logger: Arc<dyn ShutdownLogger>,
    started: AtomicBool,
}

impl ShutdownCoordinator {
    pub fn builder() -> ShutdownCoordinatorBuilder {
        ShutdownCoordinatorBuilder::new()
    }

    pub fn new(timeout: Duration, logger: Arc<dyn ShutdownLogger>) -> Self {
        Self::builder()
            .with_timeout(timeout)
            .with_logger(logger)
            .build()
    }

    pub fn from_config(config: &ShutdownConfig, logger: Arc<dyn ShutdownLogger>) -> Self {
        Self::new(config.timeout(), logger)
    }

    /// 注册匿名关闭操作
    pub fn register<F, Fut>(&self, func: F)
    where
        F: Fn(TeardownContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.push(TeardownOperation::new(func));
    }

    /// 注册带名称的关闭操作，执行前先输出组件名称
    pub fn register_named<F, Fut>(&self, name: impl Into<String>, func: F)
    where
        F: Fn(TeardownContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let name = name.into();
        let logger = self.logger.clone();
        let component = name.clone();

        self.push(TeardownOperation::named(name, move |ctx| {
            logger.info(
                "shutting down component",
                &[field("component", &component)],
            );
            func(ctx)
        }));
    }

    /// 注册实现了 [`Teardown`] 的资源
    pub fn register_resource(&self, resource: Arc<dyn Teardown>) {
        let name = resource.name().to_string();
        self.register_named(name, move |ctx| {
            let resource = resource.clone();
            async move { resource.teardown(ctx).await }
        });
    }

    fn push(&self, operation: TeardownOperation) {
        if self.is_shutting_down() {
            self.logger.warn(
                "teardown registered after shutdown began",
                &[field("component", operation.name().unwrap_or("anonymous"))],
            );
        }
        self.registry.push(operation);
    }

    /// 等待终止信号（或 [`trigger`](Self::trigger)），然后执行关闭
    pub async fn wait(&self) -> Result<ShutdownReport, ShutdownError> {
        let signal = self.signal_handler.wait_for_signal().await?;
        // 由 shutdown() 唤醒时会话已在运行，静默返回
        if self.is_shutting_down() {
            return Err(ShutdownError::AlreadyStarted);
        }
        self.logger
            .info("received shutdown signal", &[field("signal", signal)]);

        self.begin(signal)?;
        Ok(self.execute(self.timeout).await)
    }

    /// 唤醒正在 [`wait`](Self::wait) 的任务
    pub fn trigger(&self) {
        self.signal_handler.trigger(ShutdownSignal::Manual);
    }

    /// 立即执行关闭，使用配置的截止时间
    pub async fn shutdown(&self) -> Result<ShutdownReport, ShutdownError> {
        self.shutdown_with_timeout(self.timeout).await
    }

    /// 立即执行关闭，零时长使用默认截止时间
    pub async fn shutdown_with_timeout(
        &self,
        timeout: Duration,
    ) -> Result<ShutdownReport, ShutdownError> {
        self.begin(ShutdownSignal::Manual)?;
        Ok(self.execute(normalize_timeout(timeout)).await)
    }

    fn begin(&self, signal: ShutdownSignal) -> Result<(), ShutdownError> {
        if self.started.swap(true, Ordering::SeqCst) {
            self.logger.warn(
                "shutdown already started, ignoring trigger",
                &[field("signal", signal)],
            );
            return Err(ShutdownError::AlreadyStarted);
        }
        self.signal_handler.trigger(signal);
        Ok(())
    }

    async fn execute(&self, timeout: Duration) -> ShutdownReport {
        let start = Instant::now();
        let deadline = deadline_after(start, timeout);
        let ctx = TeardownContext::new(deadline);

        let snapshot = self.registry.snapshot();
        let launched = snapshot.len();
        let (tx, mut rx) = mpsc::unbounded_channel();

        // 后注册的先启动
        for operation in snapshot.into_iter().rev() {
            let tx = tx.clone();
            let ctx = ctx.clone();

            tokio::spawn(async move {
                let name = operation.name().map(str::to_string);
                let task = tokio::spawn(async move { operation.run(ctx).await });

                let result = match task.await {
                    Ok(result) => result,
                    Err(e) if e.is_panic() => Err(anyhow!("teardown task panicked: {}", e)),
                    Err(e) => Err(anyhow!("teardown task aborted: {}", e)),
                };
                // 接收端在截止时间后已关闭，结果直接丢弃
                let _ = tx.send(TaskOutcome { name, result });
            });
        }
        drop(tx);

        let mut outcomes = Vec::with_capacity(launched);
        let joint = async {
            while outcomes.len() < launched {
                match rx.recv().await {
                    Some(outcome) => outcomes.push(outcome),
                    None => break,
                }
            }
        };
        let outcome = match timeout_at(deadline, joint).await {
            Ok(()) => ShutdownOutcome::Completed,
            Err(_) => ShutdownOutcome::TimedOut,
        };
        ctx.cancel();

        while let Ok(late) = rx.try_recv() {
            outcomes.push(late);
        }
        rx.close();

        let finished = outcomes.len();
        let failures = outcomes
            .into_iter()
            .filter_map(|outcome| {
                outcome.result.err().map(|error| TeardownFailure {
                    name: outcome.name,
                    error,
                })
            })
            .collect();

        let report = ShutdownReport {
            outcome,
            launched,
            finished,
            failures,
            elapsed: start.elapsed(),
        };
        report.log(self.logger.as_ref());
        report
    }

    /// 订阅关闭开始通知
    pub fn subscribe(&self) -> watch::Receiver<Option<ShutdownSignal>> {
        self.signal_handler.subscribe()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn logger(&self) -> &Arc<dyn ShutdownLogger> {
        &self.logger
    }

    /// 已注册的操作数
    pub fn registered(&self) -> usize {
        self.registry.len()
    }
}

/// 关闭协调器构建器
pub struct ShutdownCoordinatorBuilder {
    timeout: Duration,
    signal_handler: Option<SignalHandler>,
    logger: Option<Arc<dyn ShutdownLogger>>,
}

impl ShutdownCoordinatorBuilder {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            signal_handler: None,
            logger: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_signal_handler(mut self, handler: SignalHandler) -> Self {
        self.signal_handler = Some(handler);
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn ShutdownLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn build(self) -> ShutdownCoordinator {
        ShutdownCoordinator {
            timeout: normalize_timeout(self.timeout),
            registry: Registry::new(),
            signal_handler: self.signal_handler.unwrap_or_default(),
            logger: self.logger.unwrap_or_else(|| Arc::new(TracingLogger)),
            started: AtomicBool::new(false),
        }
    }
}

impl Default for ShutdownCoordinatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
