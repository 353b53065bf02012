use crate::logger::{field, ShutdownLogger};
use std::time::Duration;

/// 关闭结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// 所有操作在截止时间前返回
    Completed,

    /// 截止时间到达时仍有操作未返回
    TimedOut,
}

/// 失败的关闭操作
#[derive(Debug)]
pub struct TeardownFailure {
    pub name: Option<String>,
    pub error: anyhow::Error,
}

impl TeardownFailure {
    pub fn component(&self) -> &str {
        self.name.as_deref().unwrap_or("anonymous")
    }
}

/// 一次关闭流程的汇总
#[derive(Debug)]
pub struct ShutdownReport {
    pub outcome: ShutdownOutcome,
    pub launched: usize,
    pub finished: usize,
    pub failures: Vec<TeardownFailure>,
    pub elapsed: Duration,
}

impl ShutdownReport {
    /// 截止时间到达时仍未返回的操作数（结果未知，不计入失败）
    pub fn pending(&self) -> usize {
        self.launched.saturating_sub(self.finished)
    }

    pub fn timed_out(&self) -> bool {
        self.outcome == ShutdownOutcome::TimedOut
    }

    pub fn is_clean(&self) -> bool {
        self.outcome == ShutdownOutcome::Completed && self.failures.is_empty()
    }

    pub(crate) fn log(&self, logger: &dyn ShutdownLogger) {
        let elapsed_ms = self.elapsed.as_millis();

        match self.outcome {
            ShutdownOutcome::Completed => logger.info(
                "shutdown completed",
                &[
                    field("operations", self.launched),
                    field("failed", self.failures.len()),
                    field("elapsed_ms", elapsed_ms),
                ],
            ),
            ShutdownOutcome::TimedOut => logger.warn(
                "shutdown timed out, forcing exit",
                &[
                    field("operations", self.launched),
                    field("pending", self.pending()),
                    field("elapsed_ms", elapsed_ms),
                ],
            ),
        }

        for failure in &self.failures {
            logger.error(
                "shutdown operation failed",
                &[
                    field("component", failure.component()),
                    field("error", format!("{:#}", failure.error)),
                ],
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::Field;
    use anyhow::anyhow;
    use std::sync::Mutex;

    #[derive(Default)]
    struct EventLog(Mutex<Vec<(&'static str, String, Vec<Field>)>>);

    impl ShutdownLogger for EventLog {
        fn info(&self, event: &str, fields: &[Field]) {
            self.0.lock().unwrap().push(("info", event.to_string(), fields.to_vec()));
        }

        fn warn(&self, event: &str, fields: &[Field]) {
            self.0.lock().unwrap().push(("warn", event.to_string(), fields.to_vec()));
        }

        fn error(&self, event: &str, fields: &[Field]) {
            self.0.lock().unwrap().push(("error", event.to_string(), fields.to_vec()));
        }
    }

    #[test]
    fn test_timed_out_report() {
        let report = ShutdownReport {
            outcome: ShutdownOutcome::TimedOut,
            launched: 3,
            finished: 1,
            failures: vec![TeardownFailure {
                name: None,
                error: anyhow!("socket closed").context("flush failed"),
            }],
            elapsed: Duration::from_millis(200),
        };

        assert_eq!(report.pending(), 2);
        assert!(report.timed_out());
        assert!(!report.is_clean());

        let log = EventLog::default();
        report.log(&log);

        let events = log.0.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].0, "warn");
        assert_eq!(events[0].1, "shutdown timed out, forcing exit");
        assert_eq!(events[1].0, "error");
        assert_eq!(events[1].2[0], field("component", "anonymous"));
        assert_eq!(events[1].2[1], field("error", "flush failed: socket closed"));
    }

    #[test]
    fn test_clean_report() {
        let report = ShutdownReport {
            outcome: ShutdownOutcome::Completed,
            launched: 2,
            finished: 2,
            failures: Vec::new(),
            elapsed: Duration::from_millis(3),
        };
        assert!(report.is_clean());

        let log = EventLog::default();
        report.log(&log);

        let events = log.0.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].1, "shutdown completed");
    }
}
