#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use strap_shutdown::{Field, ShutdownLogger};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone)]
pub struct Record {
    pub level: Level,
    pub event: String,
    pub fields: Vec<Field>,
}

impl Record {
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.key == key)
            .map(|f| f.value.as_str())
    }
}

/// 记录所有事件的测试日志
#[derive(Debug, Default)]
pub struct RecordingLogger {
    records: Mutex<Vec<Record>>,
}

impl RecordingLogger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn records(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }

    pub fn events(&self, level: Level, event: &str) -> Vec<Record> {
        self.records()
            .into_iter()
            .filter(|r| r.level == level && r.event == event)
            .collect()
    }

    pub fn count(&self, level: Level, event: &str) -> usize {
        self.events(level, event).len()
    }

    pub fn count_level(&self, level: Level) -> usize {
        self.records().iter().filter(|r| r.level == level).count()
    }

    fn push(&self, level: Level, event: &str, fields: &[Field]) {
        self.records.lock().unwrap().push(Record {
            level,
            event: event.to_string(),
            fields: fields.to_vec(),
        });
    }
}

impl ShutdownLogger for RecordingLogger {
    fn info(&self, event: &str, fields: &[Field]) {
        self.push(Level::Info, event, fields);
    }

    fn warn(&self, event: &str, fields: &[Field]) {
        self.push(Level::Warn, event, fields);
    }

    fn error(&self, event: &str, fields: &[Field]) {
        self.push(Level::Error, event, fields);
    }
}

pub const COMPLETED: &str = "shutdown completed";
pub const TIMED_OUT: &str = "shutdown timed out, forcing exit";
pub const FAILED: &str = "shutdown operation failed";
