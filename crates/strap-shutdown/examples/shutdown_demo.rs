use anyhow::anyhow;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use strap_config::ConfigLoader;
use strap_health::{Health, PingChecker};
use strap_shutdown::{Teardown, TeardownContext, TracingLogger};
use tokio::time::sleep;

/// 模拟数据库连接池
struct DatabasePool {
    name: String,
}

#[async_trait]
impl Teardown for DatabasePool {
    fn name(&self) -> &str {
        &self.name
    }

    async fn teardown(&self, ctx: TeardownContext) -> anyhow::Result<()> {
        tokio::select! {
            _ = sleep(Duration::from_millis(300)) => {
                tracing::info!("database pool closed");
                Ok(())
            }
            _ = ctx.cancelled() => Err(anyhow!("database pool close interrupted")),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "strap.toml".to_string());
    let config = ConfigLoader::new(&path).load_validated()?;
    let logging_guard = strap_logging::init_logging(&config.logging)?;

    tracing::info!(
        service = %config.service.name,
        timeout_ms = config.shutdown.timeout().as_millis() as u64,
        "starting shutdown demo"
    );

    let coordinator = strap_shutdown::setup(config.shutdown.timeout(), Arc::new(TracingLogger));

    let health = Arc::new(Health::from_config(&config.health));
    health.register(Arc::new(PingChecker::new("postgres", |_ctx| async { Ok(()) })));
    let readiness = health.withdraw_on_shutdown(coordinator.subscribe());
    health.set_ready(true);

    let report = health.readiness().await;
    tracing::info!(status = report.status_code(), "readiness reported");

    // 模拟一个在取消前持续工作的消费者
    let consumer_stop = coordinator.subscribe();
    let worker = tokio::spawn(async move {
        let mut stop = consumer_stop;
        let mut processed = 0u64;
        loop {
            tokio::select! {
                _ = stop.changed() => break,
                _ = sleep(Duration::from_millis(100)) => processed += 1,
            }
        }
        processed
    });

    strap_shutdown::register_resource(Arc::new(DatabasePool {
        name: "postgres".to_string(),
    }));

    strap_shutdown::register_named("http-server", |ctx: TeardownContext| async move {
        let token = ctx.token();
        tokio::select! {
            _ = sleep(Duration::from_millis(150)) => {
                tracing::info!(remaining_ms = ctx.remaining().as_millis() as u64, "http connections drained");
                Ok(())
            }
            _ = token.cancelled() => Err(anyhow!("http drain cancelled")),
        }
    });

    strap_shutdown::register_named("metrics-exporter", |_ctx| async {
        Err(anyhow!("push gateway unreachable"))
    });

    // 没有按 Ctrl+C 时 3 秒后自动触发
    {
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            sleep(Duration::from_secs(3)).await;
            coordinator.trigger();
        });
    }

    tracing::info!("press Ctrl+C to shut down");
    strap_shutdown::wait().await;

    if let Ok(processed) = worker.await {
        tracing::info!(processed, "consumer stopped");
    }
    let _ = readiness.await;
    tracing::info!(
        status = health.readiness().await.status_code(),
        "readiness after shutdown"
    );

    logging_guard.flush();
    Ok(())
}
