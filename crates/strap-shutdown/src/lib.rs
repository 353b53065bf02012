//! 进程级优雅关闭协调器
//!
//! 各子系统在启动阶段注册关闭操作，进程收到终止信号（或被显式触发）时，
//! 协调器以逆注册顺序并发启动全部操作，用同一个截止时间约束整体耗时，
//! 并汇总每个操作的结果。

pub mod config;
pub mod coordinator;
pub mod error;
pub mod global;
pub mod logger;
pub mod operation;
pub mod registry;
pub mod report;
pub mod signal;

pub use config::{normalize_timeout, ShutdownConfig, DEFAULT_SHUTDOWN_TIMEOUT};
pub use coordinator::{ShutdownCoordinator, ShutdownCoordinatorBuilder};
pub use error::ShutdownError;
pub use global::{
    global, register, register_named, register_resource, setup, try_register, try_wait, wait,
};
pub use logger::{field, Field, ShutdownLogger, TracingLogger};
pub use operation::{Teardown, TeardownContext, TeardownOperation};
pub use registry::Registry;
pub use report::{ShutdownOutcome, ShutdownReport, TeardownFailure};
pub use signal::{ShutdownSignal, SignalHandler};
