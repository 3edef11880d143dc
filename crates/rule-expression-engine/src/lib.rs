//! 规则表达式引擎
//!
//! 把 `age > 30 AND department = 'Sales'` 这样的条件字符串解析成
//! 二叉语法树，并在其上提供完整的规则能力：
//! - 词法分析 + 递归下降解析
//! - 对扁平数据记录的纯函数求值
//! - 多规则组合（显式选择策略）
//! - 属性目录校验
//! - 函数式（结构共享）树修改
//! - 平铺树与规范字符串序列化
//!
//! 规则存储和属性目录通过接口注入，HTTP 等接入层不在本 crate 范围内。

pub mod ast;
pub mod combiner;
pub mod error;
pub mod evaluator;
pub mod lexer;
pub mod mutator;
pub mod parser;
pub mod service;
pub mod store;
pub mod validator;

pub use ast::{Node, OperandValue, Operator, PlainNode};
pub use combiner::{combine, most_frequent_root, sequential_and, CombinePolicy};
pub use error::{Result, RuleError};
pub use evaluator::{evaluate, DataRecord, EvaluationOutcome, Evaluator};
pub use mutator::{modify, NodePatch};
pub use parser::parse_rule;
pub use service::{
    CombineRequest, CombineResponse, CreateRuleRequest, EvaluateRequest, EvaluateResponse,
    RuleService,
};
pub use store::{MemoryRuleStorage, RuleRecord, RuleStorage};
pub use validator::{validate, AttributeCatalog, AttributeType, CatalogProvider, StaticCatalog};
