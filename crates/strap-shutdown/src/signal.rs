use crate::error::ShutdownError;
use std::fmt;
use tokio::sync::watch;

/// 关闭信号类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// SIGINT - Ctrl+C
    Interrupt,

    /// SIGTERM - 优雅关闭
    Terminate,

    /// SIGQUIT
    Quit,

    /// 手动触发
    Manual,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShutdownSignal::Interrupt => "SIGINT",
            ShutdownSignal::Terminate => "SIGTERM",
            ShutdownSignal::Quit => "SIGQUIT",
            ShutdownSignal::Manual => "manual",
        };
        f.write_str(name)
    }
}

/// 信号处理器
///
/// 第一次触发生效，之后订阅的接收端也能看到触发原因。
#[derive(Debug)]
pub struct SignalHandler {
    shutdown_tx: watch::Sender<Option<ShutdownSignal>>,
}

impl SignalHandler {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { shutdown_tx: tx }
    }

    /// 记录触发原因，已经触发过时返回 false
    pub fn trigger(&self, signal: ShutdownSignal) -> bool {
        self.shutdown_tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(signal);
            true
        })
    }

    pub fn triggered(&self) -> Option<ShutdownSignal> {
        *self.shutdown_tx.borrow()
    }

    /// 订阅关闭信号
    pub fn subscribe(&self) -> watch::Receiver<Option<ShutdownSignal>> {
        self.shutdown_tx.subscribe()
    }

    /// 等待手动触发
    pub async fn wait_for_trigger(&self) -> ShutdownSignal {
        let mut rx = self.shutdown_tx.subscribe();
        let signal = rx.wait_for(Option::is_some).await.map(|s| *s);
        signal.ok().flatten().unwrap_or(ShutdownSignal::Manual)
    }

    /// 等待系统终止信号或手动触发
    #[cfg(unix)]
    pub async fn wait_for_signal(&self) -> Result<ShutdownSignal, ShutdownError> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt()).map_err(ShutdownError::SignalInstall)?;
        let mut sigterm = signal(SignalKind::terminate()).map_err(ShutdownError::SignalInstall)?;
        let mut sigquit = signal(SignalKind::quit()).map_err(ShutdownError::SignalInstall)?;

        let received = tokio::select! {
            _ = sigint.recv() => ShutdownSignal::Interrupt,
            _ = sigterm.recv() => ShutdownSignal::Terminate,
            _ = sigquit.recv() => ShutdownSignal::Quit,
            signal = self.wait_for_trigger() => signal,
        };
        Ok(received)
    }

    /// 等待系统信号（Windows 版本）
    #[cfg(not(unix))]
    pub async fn wait_for_signal(&self) -> Result<ShutdownSignal, ShutdownError> {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.map_err(ShutdownError::SignalInstall)?;
                Ok(ShutdownSignal::Interrupt)
            }
            signal = self.wait_for_trigger() => Ok(signal),
        }
    }
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_manual_trigger() {
        let handler = SignalHandler::new();
        let mut rx = handler.subscribe();

        assert!(handler.trigger(ShutdownSignal::Manual));

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), Some(ShutdownSignal::Manual));
        assert_eq!(handler.triggered(), Some(ShutdownSignal::Manual));
    }

    #[tokio::test]
    async fn test_first_trigger_wins() {
        let handler = SignalHandler::new();

        assert!(handler.trigger(ShutdownSignal::Terminate));
        assert!(!handler.trigger(ShutdownSignal::Manual));
        assert_eq!(handler.triggered(), Some(ShutdownSignal::Terminate));
    }

    #[tokio::test]
    async fn test_late_waiter_sees_earlier_trigger() {
        let handler = SignalHandler::new();
        handler.trigger(ShutdownSignal::Quit);

        let signal = tokio::time::timeout(Duration::from_secs(1), handler.wait_for_trigger())
            .await
            .unwrap();
        assert_eq!(signal, ShutdownSignal::Quit);
    }

    #[tokio::test]
    async fn test_wait_for_signal_returns_on_manual_trigger() {
        let handler = Arc::new(SignalHandler::new());

        let waiter = {
            let handler = handler.clone();
            tokio::spawn(async move { handler.wait_for_signal().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        handler.trigger(ShutdownSignal::Manual);

        let signal = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(signal, ShutdownSignal::Manual);
    }

    #[test]
    fn test_signal_display() {
        assert_eq!(ShutdownSignal::Interrupt.to_string(), "SIGINT");
        assert_eq!(ShutdownSignal::Terminate.to_string(), "SIGTERM");
        assert_eq!(ShutdownSignal::Quit.to_string(), "SIGQUIT");
    }
}
