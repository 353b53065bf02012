//! 健康检查
//!
//! 聚合各子系统注册的检查器，提供存活、就绪和启动三类探测结果。
//! 就绪标志可以绑定到关闭协调器：关闭一开始即报告未就绪，
//! 负载均衡器据此停止转发新请求。

pub mod checker;
pub mod config;
pub mod health;

pub use checker::{Check, CheckContext, HealthChecker, HealthStatus, PingChecker};
pub use config::{HealthConfig, DEFAULT_CHECK_TIMEOUT};
pub use health::{Health, HealthReport};
