use std::fmt;
use tracing::Level;

/// 结构化日志字段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub key: &'static str,
    pub value: String,
}

pub fn field(key: &'static str, value: impl fmt::Display) -> Field {
    Field {
        key,
        value: value.to_string(),
    }
}

/// 协调器输出状态和错误的日志接口
pub trait ShutdownLogger: Send + Sync {
    fn info(&self, event: &str, fields: &[Field]);

    fn warn(&self, event: &str, fields: &[Field]);

    fn error(&self, event: &str, fields: &[Field]);
}

/// 转发到 `tracing` 的默认实现
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

struct Fields<'a>(&'a [Field]);

impl fmt::Display for Fields<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}={}", field.key, field.value)?;
        }
        Ok(())
    }
}

/// 已知键作为独立的 tracing 字段输出，JSON 层可以按字段检索；
/// 其余键合并到 `extra`
#[derive(Debug, Default, PartialEq)]
struct EventFields<'a> {
    component: Option<&'a str>,
    signal: Option<&'a str>,
    error: Option<&'a str>,
    operations: Option<u64>,
    failed: Option<u64>,
    pending: Option<u64>,
    elapsed_ms: Option<u64>,
    extra: Vec<Field>,
}

impl<'a> EventFields<'a> {
    fn collect(fields: &'a [Field]) -> Self {
        let mut out = Self::default();
        for field in fields {
            let value = field.value.as_str();
            match field.key {
                "component" => out.component = Some(value),
                "signal" => out.signal = Some(value),
                "error" => out.error = Some(value),
                "operations" => out.operations = value.parse().ok(),
                "failed" => out.failed = value.parse().ok(),
                "pending" => out.pending = value.parse().ok(),
                "elapsed_ms" => out.elapsed_ms = value.parse().ok(),
                _ => out.extra.push(field.clone()),
            }
        }
        out
    }

    fn extra(&self) -> Option<String> {
        if self.extra.is_empty() {
            None
        } else {
            Some(Fields(&self.extra).to_string())
        }
    }
}

macro_rules! emit {
    ($level:expr, $event:expr, $fields:expr) => {{
        let f = EventFields::collect($fields);
        let extra = f.extra();
        tracing::event!(
            target: "strap_shutdown",
            $level,
            component = f.component,
            signal = f.signal,
            error = f.error,
            operations = f.operations,
            failed = f.failed,
            pending = f.pending,
            elapsed_ms = f.elapsed_ms,
            fields = extra.as_deref(),
            "{}",
            $event
        );
    }};
}

impl ShutdownLogger for TracingLogger {
    fn info(&self, event: &str, fields: &[Field]) {
        emit!(Level::INFO, event, fields);
    }

    fn warn(&self, event: &str, fields: &[Field]) {
        emit!(Level::WARN, event, fields);
    }

    fn error(&self, event: &str, fields: &[Field]) {
        emit!(Level::ERROR, event, fields);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_display() {
        let fields = [field("component", "postgres"), field("elapsed_ms", 12)];
        assert_eq!(
            Fields(&fields).to_string(),
            "component=postgres elapsed_ms=12"
        );
        assert_eq!(Fields(&[]).to_string(), "");
    }

    #[test]
    fn test_known_keys_become_typed_fields() {
        let fields = [
            field("component", "postgres"),
            field("elapsed_ms", 12),
            field("operations", 3),
            field("error", "disconnect failed"),
            field("region", "eu"),
        ];
        let collected = EventFields::collect(&fields);

        assert_eq!(collected.component, Some("postgres"));
        assert_eq!(collected.error, Some("disconnect failed"));
        assert_eq!(collected.elapsed_ms, Some(12));
        assert_eq!(collected.operations, Some(3));
        assert_eq!(collected.signal, None);
        assert_eq!(collected.extra(), Some("region=eu".to_string()));
        assert_eq!(EventFields::collect(&[]).extra(), None);
    }

    #[test]
    fn test_tracing_logger_accepts_any_fields() {
        let logger = TracingLogger;
        logger.info("shutdown completed", &[field("operations", 2)]);
        logger.warn("odd", &[field("pending", "not-a-number")]);
        logger.error("shutdown operation failed", &[field("component", "db")]);
    }
}
