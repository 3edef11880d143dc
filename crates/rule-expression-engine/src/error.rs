//! 规则引擎错误类型

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("词法分析失败: 位置 {position} 处无法识别 '{fragment}'")]
    TokenizeError { position: usize, fragment: String },

    #[error("规则解析失败: {0}")]
    ParseError(String),

    #[error("无效的语法树: {0}")]
    InvalidTree(String),

    #[error("不支持的操作符: {0}")]
    UnknownOperator(String),

    #[error("属性不在目录中: {attribute} (位于 {path})")]
    AttributeNotInCatalog { attribute: String, path: String },

    #[error("节点左右子树均已占用, 无法挂载新节点")]
    NodeSlotOccupied,

    #[error("规则未找到: {0}")]
    RuleNotFound(String),

    #[error("无效的请求: {0}")]
    BadRequest(String),

    #[error("JSON 序列化错误: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RuleError>;
