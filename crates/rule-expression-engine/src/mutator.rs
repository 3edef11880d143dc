//! 语法树修改
//!
//! 对已有语法树做局部定向编辑。修改是函数式的：返回一棵新树，未
//! 触及的子树通过 `Arc` 与旧树共享，旧树本身不被改写，并发读旧树
//! 的一方不受影响。修改结果仍满足节点构造不变量。

use crate::ast::{Node, OperandValue, Operator};
use crate::error::{Result, RuleError};
use crate::parser::parse_rule;
use serde::Deserialize;
use std::sync::Arc;

/// 节点修改补丁
///
/// 各字段均可选：`op` 替换操作符节点的操作符，`value` 替换操作数
/// 节点的取值（按词法规则重新分类），`left` / `right` 递归下发到
/// 对应子树，`new_node` 是一条规则字符串，解析后挂到空闲子树槽位。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodePatch {
    pub op: Option<Operator>,
    pub value: Option<String>,
    pub left: Option<Box<NodePatch>>,
    pub right: Option<Box<NodePatch>>,
    pub new_node: Option<String>,
}

/// 应用补丁，返回新树
///
/// 与节点形态不符的编辑立即失败：操作数节点不接受 `op` / 子树
/// 补丁，操作符节点不接受 `value`。合法树中操作符节点的两个槽位
/// 总是已被占用，`new_node` 对其失败 `NodeSlotOccupied`；操作数
/// 节点没有子树槽位，挂载同样被拒绝。
pub fn modify(node: &Arc<Node>, patch: &NodePatch) -> Result<Arc<Node>> {
    match &**node {
        Node::Operand(_) => {
            if patch.op.is_some() {
                return Err(RuleError::InvalidTree(
                    "操作数节点不能替换操作符".to_string(),
                ));
            }
            if patch.left.is_some() || patch.right.is_some() {
                return Err(RuleError::InvalidTree(
                    "操作数节点没有子树可修改".to_string(),
                ));
            }
            if patch.new_node.is_some() {
                return Err(RuleError::InvalidTree(
                    "操作数节点不能挂载子树".to_string(),
                ));
            }

            match &patch.value {
                Some(raw) => Ok(Arc::new(Node::Operand(OperandValue::parse_token(raw)?))),
                None => Ok(node.clone()),
            }
        }
        Node::Operator { op, left, right } => {
            if patch.value.is_some() {
                return Err(RuleError::InvalidTree(
                    "操作符节点不能替换操作数值".to_string(),
                ));
            }
            if let Some(rule) = &patch.new_node {
                // 预先解析以便报告规则本身的错误，但两个槽位必然已被占用
                parse_rule(rule)?;
                return Err(RuleError::NodeSlotOccupied);
            }

            let new_op = patch.op.unwrap_or(*op);
            let new_left = match &patch.left {
                Some(child_patch) => modify(left, child_patch)?,
                None => left.clone(),
            };
            let new_right = match &patch.right {
                Some(child_patch) => modify(right, child_patch)?,
                None => right.clone(),
            };

            Ok(Node::operator(new_op, new_left, new_right))
        }
    }
}
