//! 规则语法树领域模型
//!
//! 定义二叉语法树节点（操作符 / 操作数）、操作符集合，以及用于存储和
//! 传输的平铺树表示（PlainNode）。节点的子树通过 `Arc` 共享，修改操作
//! 总是生成新树而不改写旧树。

use crate::error::{Result, RuleError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// 操作符（逻辑 + 比较）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Operator {
    And,
    Or,
    Gt,
    Lt,
    Gte,
    Lte,
    Eq,
}

impl Operator {
    /// 是否为逻辑操作符（AND / OR）
    pub fn is_logical(&self) -> bool {
        matches!(self, Self::And | Self::Or)
    }

    /// 是否为比较操作符
    pub fn is_comparison(&self) -> bool {
        !self.is_logical()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Gte => ">=",
            Self::Lte => "<=",
            Self::Eq => "=",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Operator {
    type Err = RuleError;

    /// AND / OR 不区分大小写，比较操作符精确匹配
    fn from_str(s: &str) -> Result<Self> {
        match s {
            ">" => Ok(Self::Gt),
            "<" => Ok(Self::Lt),
            ">=" => Ok(Self::Gte),
            "<=" => Ok(Self::Lte),
            "=" => Ok(Self::Eq),
            _ if s.eq_ignore_ascii_case("AND") => Ok(Self::And),
            _ if s.eq_ignore_ascii_case("OR") => Ok(Self::Or),
            _ => Err(RuleError::UnknownOperator(s.to_string())),
        }
    }
}

impl TryFrom<String> for Operator {
    type Error = RuleError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        op.to_string()
    }
}

/// 操作数取值
///
/// 解析器在词法层面就区分属性引用和字面量，避免仅靠目录成员关系
/// 判断操作数角色的歧义。
#[derive(Debug, Clone, PartialEq)]
pub enum OperandValue {
    /// 属性引用，如 `age`
    Attribute(String),
    /// 数值字面量，如 `30` 或 `5.5`
    Number(f64),
    /// 字符串字面量，如 `'Sales'`（存储时去掉引号）
    Text(String),
}

impl OperandValue {
    /// 把单个操作数 token 文本还原为 OperandValue
    ///
    /// 用于平铺树反序列化和节点修改：value 字符串按词法规则重新分类，
    /// 必须恰好是一个操作数 token。
    pub fn parse_token(raw: &str) -> Result<Self> {
        let tokens = crate::lexer::tokenize(raw)?;
        match tokens.as_slice() {
            [crate::lexer::Token::Ident(name)] => Ok(Self::Attribute(name.clone())),
            [crate::lexer::Token::Number(n)] => Ok(Self::Number(*n)),
            [crate::lexer::Token::Text(s)] => Ok(Self::Text(s.clone())),
            _ => Err(RuleError::InvalidTree(format!(
                "'{}' 不是合法的操作数",
                raw
            ))),
        }
    }
}

impl fmt::Display for OperandValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attribute(name) => write!(f, "{}", name),
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "'{}'", s),
        }
    }
}

/// 语法树节点
///
/// 操作符节点必有左右两个子树，操作数节点没有子树，不存在第三种形态。
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Operator {
        op: Operator,
        left: Arc<Node>,
        right: Arc<Node>,
    },
    Operand(OperandValue),
}

impl Node {
    /// 构造操作符节点
    pub fn operator(op: Operator, left: Arc<Node>, right: Arc<Node>) -> Arc<Node> {
        Arc::new(Node::Operator { op, left, right })
    }

    /// 构造属性引用操作数
    pub fn attribute(name: impl Into<String>) -> Arc<Node> {
        Arc::new(Node::Operand(OperandValue::Attribute(name.into())))
    }

    /// 构造数值字面量操作数
    pub fn number(value: f64) -> Arc<Node> {
        Arc::new(Node::Operand(OperandValue::Number(value)))
    }

    /// 构造字符串字面量操作数
    pub fn text(value: impl Into<String>) -> Arc<Node> {
        Arc::new(Node::Operand(OperandValue::Text(value.into())))
    }

    pub fn is_operator(&self) -> bool {
        matches!(self, Node::Operator { .. })
    }

    pub fn is_operand(&self) -> bool {
        matches!(self, Node::Operand(_))
    }

    /// 渲染为规范规则字符串
    ///
    /// 操作数渲染为其 token 形式，操作符渲染为全括号中缀形式
    /// `(left OP right)`。渲染结果重新解析后得到结构相同的树。
    pub fn expression(&self) -> String {
        match self {
            Node::Operand(value) => value.to_string(),
            Node::Operator { op, left, right } => {
                format!("({} {} {})", left.expression(), op, right.expression())
            }
        }
    }

    /// 转换为平铺树表示
    pub fn to_plain(&self) -> PlainNode {
        match self {
            Node::Operand(value) => PlainNode {
                kind: "operand".to_string(),
                value: value.to_string(),
                left: None,
                right: None,
            },
            Node::Operator { op, left, right } => PlainNode {
                kind: "operator".to_string(),
                value: op.to_string(),
                left: Some(Box::new(left.to_plain())),
                right: Some(Box::new(right.to_plain())),
            },
        }
    }

    /// 从平铺树还原节点，重新校验全部构造不变量
    ///
    /// 外部构造的树只能从这里进入，因此变体不变量（操作符必有双子树、
    /// 操作数无子树且必有值）和操作符合法性都在此处兜底检查。
    pub fn from_plain(plain: &PlainNode) -> Result<Arc<Node>> {
        match plain.kind.as_str() {
            "operator" => {
                let op: Operator = plain.value.parse()?;
                let left = plain.left.as_deref().ok_or_else(|| {
                    RuleError::InvalidTree("操作符节点缺少左子树".to_string())
                })?;
                let right = plain.right.as_deref().ok_or_else(|| {
                    RuleError::InvalidTree("操作符节点缺少右子树".to_string())
                })?;
                Ok(Node::operator(
                    op,
                    Self::from_plain(left)?,
                    Self::from_plain(right)?,
                ))
            }
            "operand" => {
                if plain.left.is_some() || plain.right.is_some() {
                    return Err(RuleError::InvalidTree(
                        "操作数节点不能携带子树".to_string(),
                    ));
                }
                if plain.value.is_empty() {
                    return Err(RuleError::InvalidTree(
                        "操作数节点缺少取值".to_string(),
                    ));
                }
                Ok(Arc::new(Node::Operand(OperandValue::parse_token(
                    &plain.value,
                )?)))
            }
            other => Err(RuleError::InvalidTree(format!(
                "未知节点类型 '{}'，应为 'operator' 或 'operand'",
                other
            ))),
        }
    }
}

/// 平铺树表示，用于存储和传输
///
/// 操作数节点的 left / right 恒为 null，操作符节点的 left / right
/// 恒为非 null。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlainNode {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    pub left: Option<Box<PlainNode>>,
    pub right: Option<Box<PlainNode>>,
}
