use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;

use super::{KvError, KvStore};

/// Process-local store; prefix scans come back in key order.
#[derive(Default)]
pub struct MemoryKvStore {
    entries: RwLock<BTreeMap<String, serde_json::Value>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, KvError> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &serde_json::Value) -> Result<(), KvError> {
        self.entries.write().insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, KvError> {
        Ok(self.entries.write().remove(key).is_some())
    }

    async fn get_by_prefix(&self, prefix: &str) -> Result<Vec<serde_json::Value>, KvError> {
        let entries = self.entries.read();
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(_, v)| v.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn set_get_overwrite_delete() {
        let kv = MemoryKvStore::new();
        assert_eq!(kv.get("a").await.unwrap(), None);

        kv.set("a", &json!({"v": 1})).await.unwrap();
        kv.set("a", &json!({"v": 2})).await.unwrap();
        assert_eq!(kv.get("a").await.unwrap(), Some(json!({"v": 2})));
        assert_eq!(kv.len(), 1);

        assert!(kv.delete("a").await.unwrap());
        assert!(!kv.delete("a").await.unwrap());
        assert!(kv.is_empty());
    }

    #[tokio::test]
    async fn prefix_scan_stops_at_prefix_boundary() {
        let kv = MemoryKvStore::new();
        kv.set("user:1:journey:a", &json!(1)).await.unwrap();
        kv.set("user:1:journey:b", &json!(2)).await.unwrap();
        kv.set("user:1:profile", &json!(3)).await.unwrap();
        kv.set("user:10:journey:a", &json!(4)).await.unwrap();
        kv.set("user:0", &json!(5)).await.unwrap();

        let found = kv.get_by_prefix("user:1:journey:").await.unwrap();
        assert_eq!(found, vec![json!(1), json!(2)]);
        assert!(kv.get_by_prefix("nothing:").await.unwrap().is_empty());
        assert_eq!(kv.get_by_prefix("").await.unwrap().len(), 5);
    }
}
