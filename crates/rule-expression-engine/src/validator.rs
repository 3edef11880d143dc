//! 属性目录校验
//!
//! 属性目录是外部协作方维护的 属性名 -> 基础类型 映射，核心每次
//! 校验只读取一份快照。校验对语法树做先序遍历，所有属性引用叶子
//! 必须出现在目录中，字面量叶子不参与校验，遇到第一个未知属性立即
//! 失败并带回节点路径。

use crate::ast::{Node, OperandValue};
use crate::error::{Result, RuleError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 属性的基础数据类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    Number,
    String,
    Boolean,
}

/// 属性目录快照
pub type AttributeCatalog = HashMap<String, AttributeType>;

/// 属性目录提供方
///
/// 目录的刷新由协作方自己负责，核心把每次 snapshot 的结果当作
/// 不可变的值使用，不持有活引用。
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    async fn snapshot(&self) -> Result<AttributeCatalog>;
}

/// 固定内容的属性目录，用于测试和嵌入场景
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    attributes: AttributeCatalog,
}

impl StaticCatalog {
    pub fn new(attributes: AttributeCatalog) -> Self {
        Self { attributes }
    }
}

#[async_trait]
impl CatalogProvider for StaticCatalog {
    async fn snapshot(&self) -> Result<AttributeCatalog> {
        Ok(self.attributes.clone())
    }
}

/// 校验语法树中的全部属性引用
pub fn validate(node: &Node, catalog: &AttributeCatalog) -> Result<()> {
    walk(node, catalog, "root")
}

fn walk(node: &Node, catalog: &AttributeCatalog, path: &str) -> Result<()> {
    match node {
        Node::Operand(OperandValue::Attribute(name)) => {
            if catalog.contains_key(name) {
                Ok(())
            } else {
                Err(RuleError::AttributeNotInCatalog {
                    attribute: name.clone(),
                    path: path.to_string(),
                })
            }
        }
        Node::Operand(_) => Ok(()),
        Node::Operator { left, right, .. } => {
            walk(left, catalog, &format!("{}.left", path))?;
            walk(right, catalog, &format!("{}.right", path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_rule;

    fn sample_catalog() -> AttributeCatalog {
        AttributeCatalog::from([
            ("age".to_string(), AttributeType::Number),
            ("salary".to_string(), AttributeType::Number),
            ("department".to_string(), AttributeType::String),
            ("is_manager".to_string(), AttributeType::Boolean),
        ])
    }

    #[test]
    fn test_validate_known_attributes() {
        let ast = parse_rule("age > 30 AND department = 'Sales'").unwrap();
        assert!(validate(&ast, &sample_catalog()).is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_attribute() {
        let ast = parse_rule("unknownAttr > 5").unwrap();
        let err = validate(&ast, &sample_catalog()).unwrap_err();

        match err {
            RuleError::AttributeNotInCatalog { attribute, path } => {
                assert_eq!(attribute, "unknownAttr");
                assert_eq!(path, "root.left");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_validate_fails_fast_on_first_unknown() {
        // experience 和 title 都不在目录中，报告先序遍历先遇到的那个
        let ast = parse_rule("experience > 5 OR title = 'VP'").unwrap();
        let err = validate(&ast, &sample_catalog()).unwrap_err();

        match err {
            RuleError::AttributeNotInCatalog { attribute, path } => {
                assert_eq!(attribute, "experience");
                assert_eq!(path, "root.left.left");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_validate_ignores_literals() {
        // 'Sales' 与 30 是字面量，不需要出现在目录中
        let ast = parse_rule("department = 'Sales' AND age > 30").unwrap();
        assert!(validate(&ast, &sample_catalog()).is_ok());
    }

    #[test]
    fn test_validate_literal_matching_attribute_name_is_not_checked() {
        // 引号字面量即便与属性名同形也不会被当作属性引用
        let ast = parse_rule("department = 'unknownAttr'").unwrap();
        assert!(validate(&ast, &sample_catalog()).is_ok());
    }

    #[test]
    fn test_validate_attribute_on_right_side() {
        let ast = parse_rule("salary > budget").unwrap();
        let err = validate(&ast, &sample_catalog()).unwrap_err();

        match err {
            RuleError::AttributeNotInCatalog { attribute, path } => {
                assert_eq!(attribute, "budget");
                assert_eq!(path, "root.right");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_static_catalog_snapshot() {
        let provider = StaticCatalog::new(sample_catalog());
        let snapshot = tokio_test::block_on(provider.snapshot()).unwrap();
        assert_eq!(snapshot.get("age"), Some(&AttributeType::Number));
        assert_eq!(snapshot.len(), 4);
    }
}
