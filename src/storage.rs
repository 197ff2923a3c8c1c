//! 持久化适配层：比分计数器与主题偏好。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum StorageError {
    Unavailable { reason: String },
}

impl StorageError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        StorageError::Unavailable {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Unavailable { reason } => write!(f, "storage unavailable: {reason}"),
        }
    }
}

impl std::error::Error for StorageError {}

/// 键值存储；读取失败一律按缺省值处理，写入失败交给调用方记录日志。
pub trait CounterStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    fn load_counter(&self, key: &str) -> u32 {
        self.get_item(key)
            .ok()
            .flatten()
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(0)
    }

    fn save_counter(&mut self, key: &str, value: u32) -> Result<(), StorageError> {
        self.set_item(key, &value.to_string())
    }

    fn load_preference(&self, key: &str) -> Option<String> {
        self.get_item(key).ok().flatten()
    }

    fn save_preference(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.set_item(key, value)
    }
}

/// 纯内存存储，用于测试以及浏览器存储不可用时的降级。
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    items: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CounterStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// 不可用的存储：所有读写都失败，会话只保留内存中的比分。
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledStore;

impl CounterStore for DisabledStore {
    fn get_item(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::unavailable("storage disabled"))
    }

    fn set_item(&mut self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::unavailable("storage disabled"))
    }
}

/// 浏览器 `localStorage`。
pub struct LocalStorageStore {
    storage: web_sys::Storage,
}

impl LocalStorageStore {
    pub fn open() -> Result<Self, StorageError> {
        let window =
            web_sys::window().ok_or_else(|| StorageError::unavailable("no window object"))?;
        let storage = window
            .local_storage()
            .map_err(|_| StorageError::unavailable("localStorage access denied"))?
            .ok_or_else(|| StorageError::unavailable("localStorage missing"))?;
        Ok(Self { storage })
    }
}

impl CounterStore for LocalStorageStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage
            .get_item(key)
            .map_err(|_| StorageError::unavailable(format!("failed to read {key}")))
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage
            .set_item(key, value)
            .map_err(|_| StorageError::unavailable(format!("failed to write {key}")))
    }
}
