use crate::operation::TeardownOperation;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// 关闭操作注册表，保持注册顺序
#[derive(Debug, Default)]
pub struct Registry {
    operations: Mutex<Vec<TeardownOperation>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, operation: TeardownOperation) {
        self.lock().push(operation);
    }

    /// 按注册顺序复制当前所有操作
    pub fn snapshot(&self) -> Vec<TeardownOperation> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // push 不会让 Vec 处于中间状态，锁中毒时直接取回数据
    fn lock(&self) -> MutexGuard<'_, Vec<TeardownOperation>> {
        self.operations.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
