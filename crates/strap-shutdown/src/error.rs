use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShutdownError {
    /// 同一进程内关闭流程只会执行一次
    #[error("shutdown already started")]
    AlreadyStarted,

    #[error("shutdown coordinator not initialized")]
    NotInitialized,

    #[error("failed to install signal handler: {0}")]
    SignalInstall(#[source] io::Error),
}
