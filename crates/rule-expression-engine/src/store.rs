//! 规则存储
//!
//! 核心只通过 `RuleStorage` 接口读写规则记录，不感知底层是文件、
//! 关系库还是别的后端，也从不自己拼 SQL 或文件路径。内置的
//! `MemoryRuleStorage` 用 DashMap 提供线程安全的内存实现，供测试
//! 和嵌入场景使用。

use crate::ast::PlainNode;
use crate::error::{Result, RuleError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// 规则记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleRecord {
    pub id: String,
    pub name: String,
    pub rule_string: String,
    pub ast: PlainNode,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl RuleRecord {
    pub fn new(name: impl Into<String>, rule_string: impl Into<String>, ast: PlainNode) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            rule_string: rule_string.into(),
            ast,
            created_at: now,
            updated_at: now,
        }
    }
}

/// 规则存储接口
#[async_trait]
pub trait RuleStorage: Send + Sync {
    /// 按 id 查找规则，不存在时返回 `RuleNotFound`
    async fn get_by_id(&self, id: &str) -> Result<RuleRecord>;

    /// 保存新规则
    async fn save(&self, record: RuleRecord) -> Result<()>;

    /// 更新已有规则，不存在时返回 `RuleNotFound`
    async fn update(&self, record: RuleRecord) -> Result<()>;

    /// 删除规则，不存在时返回 `RuleNotFound`
    async fn delete(&self, id: &str) -> Result<()>;

    /// 列出全部规则
    async fn list_all(&self) -> Result<Vec<RuleRecord>>;
}

/// 内存规则存储
#[derive(Clone, Default)]
pub struct MemoryRuleStorage {
    rules: Arc<DashMap<String, RuleRecord>>,
}

impl MemoryRuleStorage {
    pub fn new() -> Self {
        Self {
            rules: Arc::new(DashMap::new()),
        }
    }

    /// 当前存储的规则数量
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.rules.contains_key(id)
    }

    /// 清空所有规则
    pub fn clear(&self) {
        let count = self.rules.len();
        self.rules.clear();
        info!("已清空 {} 条规则", count);
    }
}

#[async_trait]
impl RuleStorage for MemoryRuleStorage {
    async fn get_by_id(&self, id: &str) -> Result<RuleRecord> {
        self.rules
            .get(id)
            .map(|r| r.clone())
            .ok_or_else(|| RuleError::RuleNotFound(id.to_string()))
    }

    #[instrument(skip(self, record), fields(rule_id = %record.id, rule_name = %record.name))]
    async fn save(&self, record: RuleRecord) -> Result<()> {
        let rule_id = record.id.clone();
        self.rules.insert(rule_id.clone(), record);
        info!("规则已保存: {}", rule_id);
        Ok(())
    }

    #[instrument(skip(self, record), fields(rule_id = %record.id))]
    async fn update(&self, record: RuleRecord) -> Result<()> {
        if !self.rules.contains_key(&record.id) {
            warn!("更新不存在的规则: {}", record.id);
            return Err(RuleError::RuleNotFound(record.id));
        }

        let rule_id = record.id.clone();
        self.rules.insert(rule_id.clone(), record);
        info!("规则已更新: {}", rule_id);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> Result<()> {
        if self.rules.remove(id).is_some() {
            info!("规则已删除: {}", id);
            Ok(())
        } else {
            warn!("删除不存在的规则: {}", id);
            Err(RuleError::RuleNotFound(id.to_string()))
        }
    }

    async fn list_all(&self) -> Result<Vec<RuleRecord>> {
        Ok(self.rules.iter().map(|r| r.value().clone()).collect())
    }
}
