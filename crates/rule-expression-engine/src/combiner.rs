//! 规则组合器
//!
//! 把多棵独立解析的语法树合并为一棵，提供两种策略，调用方必须显式
//! 选择，组合器不会替调用方做默认决定：
//!
//! - 顺序 AND 折叠：保证合并结果是各规则的逻辑合取
//! - 高频操作符选根：统计所有树中出现最多的操作符作为根操作符。
//!   比较操作符也参与统计，因此当选的根可能是比较操作符，把整棵
//!   规则子树当作它的操作数；需要确定逻辑语义的调用方应选择顺序
//!   AND 折叠
//!
//! 两种策略都对输入顺序敏感：折叠顺序和挂树顺序均按输入列表顺序。

use crate::ast::{Node, Operator};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 组合策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombinePolicy {
    /// 顺序 AND 折叠: (((r1 AND r2) AND r3) ... AND rn)
    SequentialAnd,
    /// 高频操作符选根，余下的树挂成右倾链
    MostFrequentOperator,
}

/// 按指定策略组合多棵语法树
///
/// 空输入返回 None（表示"恒真"，不是错误），单棵树原样返回。
pub fn combine(asts: &[Arc<Node>], policy: CombinePolicy) -> Option<Arc<Node>> {
    match policy {
        CombinePolicy::SequentialAnd => sequential_and(asts),
        CombinePolicy::MostFrequentOperator => most_frequent_root(asts),
    }
}

/// 顺序 AND 折叠
pub fn sequential_and(asts: &[Arc<Node>]) -> Option<Arc<Node>> {
    asts.iter()
        .cloned()
        .reduce(|combined, next| Node::operator(Operator::And, combined, next))
}

/// 高频操作符选根
///
/// 前两棵树分别作为新根的左右子树，其余的树依次替换当前右子树：
/// right = Operator(elected, old_right, next)，形成右倾链。
pub fn most_frequent_root(asts: &[Arc<Node>]) -> Option<Arc<Node>> {
    match asts {
        [] => None,
        [single] => Some(single.clone()),
        [first, second, rest @ ..] => {
            let elected = elect_operator(asts);
            let mut right = second.clone();
            for next in rest {
                right = Node::operator(elected, right, next.clone());
            }
            Some(Node::operator(elected, first.clone(), right))
        }
    }
}

/// 统计所有树的操作符并选出最高频者
///
/// 先序遍历逐树收集，再按首次出现顺序计数：仅当计数严格更大时才
/// 替换当选者，平局保留更早出现的操作符，保证重复调用结果一致。
fn elect_operator(asts: &[Arc<Node>]) -> Operator {
    let mut operators = Vec::new();
    for ast in asts {
        collect_operators(ast, &mut operators);
    }

    let mut counts: Vec<(Operator, usize)> = Vec::new();
    for op in &operators {
        match counts.iter_mut().find(|(seen, _)| seen == op) {
            Some(entry) => entry.1 += 1,
            None => counts.push((*op, 1)),
        }
    }

    let mut best = (Operator::And, 0);
    for &(op, count) in &counts {
        if count > best.1 {
            best = (op, count);
        }
    }
    best.0
}

/// 先序收集操作符（含比较操作符）
fn collect_operators(node: &Node, out: &mut Vec<Operator>) {
    if let Node::Operator { op, left, right } = node {
        out.push(*op);
        collect_operators(left, out);
        collect_operators(right, out);
    }
}
