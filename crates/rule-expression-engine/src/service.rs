//! 规则服务门面
//!
//! 面向外层接入层（HTTP / RPC，不在本 crate 范围内）的组合操作：
//! 创建、组合、求值、校验、修改。存储和属性目录都通过接口注入，
//! 门面自身只做编排，不持有任何后端细节。

use crate::ast::{Node, PlainNode};
use crate::combiner::{self, CombinePolicy};
use crate::error::{Result, RuleError};
use crate::evaluator::{DataRecord, Evaluator};
use crate::mutator::{self, NodePatch};
use crate::parser::parse_rule;
use crate::store::{RuleRecord, RuleStorage};
use crate::validator::{self, CatalogProvider};
use chrono::Utc;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument};

/// 创建规则请求
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRuleRequest {
    pub name: String,
    pub rule_string: String,
}

/// 组合规则请求
///
/// `rule_ids` 按 id 从存储取回，`rule_strings` 直接解析；两者可以
/// 混用，组合顺序为先 id（按给定次序）后字符串。策略必须显式给出。
#[derive(Debug, Clone, Deserialize)]
pub struct CombineRequest {
    #[serde(default)]
    pub rule_ids: Vec<String>,
    #[serde(default)]
    pub rule_strings: Vec<String>,
    pub policy: CombinePolicy,
}

/// 组合规则响应
///
/// 输入为空时表示"恒真"：rule_string 为空串，ast 为 null。
#[derive(Debug, Clone, Serialize)]
pub struct CombineResponse {
    pub rule_string: String,
    pub ast: Option<PlainNode>,
}

/// 求值请求，rule_id 与 rule_string 必须且只能给一个
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluateRequest {
    pub rule_id: Option<String>,
    pub rule_string: Option<String>,
    pub data: Value,
}

/// 求值响应
#[derive(Debug, Clone, Serialize)]
pub struct EvaluateResponse {
    pub result: bool,
    pub trace: Vec<String>,
    pub evaluation_time_ms: i64,
}

/// 规则服务
pub struct RuleService {
    storage: Arc<dyn RuleStorage>,
    catalog: Arc<dyn CatalogProvider>,
    evaluator: Evaluator,
}

impl RuleService {
    pub fn new(storage: Arc<dyn RuleStorage>, catalog: Arc<dyn CatalogProvider>) -> Self {
        Self {
            storage,
            catalog,
            evaluator: Evaluator::new().with_trace(),
        }
    }

    /// 创建规则：解析规则字符串并持久化记录
    #[instrument(skip(self, req), fields(rule_name = %req.name))]
    pub async fn create_rule(&self, req: CreateRuleRequest) -> Result<RuleRecord> {
        let ast = parse_rule(&req.rule_string)?;
        let record = RuleRecord::new(req.name, req.rule_string, ast.to_plain());

        self.storage.save(record.clone()).await?;
        info!("规则已创建: {}", record.id);
        Ok(record)
    }

    pub async fn get_rule(&self, id: &str) -> Result<RuleRecord> {
        self.storage.get_by_id(id).await
    }

    pub async fn list_rules(&self) -> Result<Vec<RuleRecord>> {
        self.storage.list_all().await
    }

    /// 组合多条规则
    ///
    /// id 对应的记录并发取回（取回之间没有顺序依赖），组合计算本身
    /// 严格按输入列表顺序进行。
    #[instrument(skip(self, req), fields(ids = req.rule_ids.len(), strings = req.rule_strings.len()))]
    pub async fn combine_rules(&self, req: CombineRequest) -> Result<CombineResponse> {
        let fetched =
            try_join_all(req.rule_ids.iter().map(|id| self.storage.get_by_id(id))).await?;

        let mut asts = Vec::with_capacity(fetched.len() + req.rule_strings.len());
        for record in &fetched {
            asts.push(parse_rule(&record.rule_string)?);
        }
        for rule_string in &req.rule_strings {
            asts.push(parse_rule(rule_string)?);
        }

        let combined = combiner::combine(&asts, req.policy);
        Ok(CombineResponse {
            rule_string: combined
                .as_ref()
                .map(|node| node.expression())
                .unwrap_or_default(),
            ast: combined.map(|node| node.to_plain()),
        })
    }

    /// 对一条规则求值
    ///
    /// 已存储的规则从其持久化的平铺树还原（还原时重新校验不变量），
    /// 裸字符串现场解析。
    #[instrument(skip(self, req))]
    pub async fn evaluate(&self, req: EvaluateRequest) -> Result<EvaluateResponse> {
        let ast = match (&req.rule_id, &req.rule_string) {
            (Some(_), Some(_)) | (None, None) => {
                return Err(RuleError::BadRequest(
                    "必须且只能提供 rule_id 或 rule_string 之一".to_string(),
                ));
            }
            (Some(id), None) => {
                let record = self.storage.get_by_id(id).await?;
                Node::from_plain(&record.ast)?
            }
            (None, Some(rule_string)) => parse_rule(rule_string)?,
        };

        let record = DataRecord::new(req.data);
        let outcome = self.evaluator.execute(&ast, &record);

        Ok(EvaluateResponse {
            result: outcome.result,
            trace: outcome.trace,
            evaluation_time_ms: outcome.evaluation_time_ms,
        })
    }

    /// 校验规则字符串中的属性引用是否都在目录中
    pub async fn validate_rule(&self, rule_string: &str) -> Result<()> {
        let ast = parse_rule(rule_string)?;
        let catalog = self.catalog.snapshot().await?;
        validator::validate(&ast, &catalog)
    }

    /// 修改已存储的规则
    ///
    /// 取回记录、还原语法树、函数式应用补丁，校验通过后重渲规范
    /// 字符串并写回存储。
    #[instrument(skip(self, patch))]
    pub async fn modify_rule(&self, id: &str, patch: NodePatch) -> Result<RuleRecord> {
        let mut record = self.storage.get_by_id(id).await?;
        let ast = Node::from_plain(&record.ast)?;

        let updated = mutator::modify(&ast, &patch)?;

        let catalog = self.catalog.snapshot().await?;
        validator::validate(&updated, &catalog)?;

        record.rule_string = updated.expression();
        record.ast = updated.to_plain();
        record.updated_at = Utc::now();

        self.storage.update(record.clone()).await?;
        info!("规则已修改: {}", id);
        Ok(record)
    }
}
