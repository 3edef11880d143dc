//! 规则求值器
//!
//! 对语法树做纯递归遍历，在一条扁平数据记录上算出布尔结果。求值
//! 没有任何副作用，两个子树总是无条件求值（不做短路，纯函数下
//! 短路与否不可观测）。

use crate::ast::{Node, OperandValue, Operator};
use crate::error::Result;
use serde_json::{json, Value};
use std::time::Instant;

/// 求值用的数据记录（属性名 -> 值 的扁平映射）
#[derive(Debug, Clone, Default)]
pub struct DataRecord {
    data: Value,
}

impl DataRecord {
    pub fn new(data: Value) -> Self {
        Self { data }
    }

    /// 从 JSON 字符串创建
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// 查找属性值，记录不是对象或属性不存在时返回 None
    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.data.as_object()?.get(attribute)
    }

    pub fn data(&self) -> &Value {
        &self.data
    }
}

/// 求值结果
#[derive(Debug, Clone)]
pub struct EvaluationOutcome {
    /// 最终布尔结论
    pub result: bool,
    /// 根节点的原始求值结果
    pub value: Value,
    /// 逐节点求值追踪（未开启追踪时为空）
    pub trace: Vec<String>,
    pub evaluation_time_ms: i64,
}

/// 求值器
///
/// 语义本身是纯函数，求值器只额外附加追踪与计时。
pub struct Evaluator {
    trace_enabled: bool,
}

impl Evaluator {
    pub fn new() -> Self {
        Self {
            trace_enabled: false,
        }
    }

    /// 启用逐节点求值追踪
    pub fn with_trace(mut self) -> Self {
        self.trace_enabled = true;
        self
    }

    /// 在数据记录上求值整棵树
    pub fn execute(&self, node: &Node, record: &DataRecord) -> EvaluationOutcome {
        let start = Instant::now();
        let mut trace = Vec::new();

        let value = self.eval_node(node, record, &mut trace, "root");

        EvaluationOutcome {
            result: truthy(&value),
            value,
            trace,
            evaluation_time_ms: start.elapsed().as_millis() as i64,
        }
    }

    fn eval_node(
        &self,
        node: &Node,
        record: &DataRecord,
        trace: &mut Vec<String>,
        path: &str,
    ) -> Value {
        match node {
            Node::Operand(operand) => {
                let value = resolve_operand(operand, record);
                if self.trace_enabled {
                    trace.push(format!("{}: {} => {}", path, operand, value));
                }
                value
            }
            Node::Operator { op, left, right } => {
                let left_value = self.eval_node(left, record, trace, &format!("{}.left", path));
                let right_value = self.eval_node(right, record, trace, &format!("{}.right", path));
                let value = apply_operator(*op, &left_value, &right_value);
                if self.trace_enabled {
                    trace.push(format!(
                        "{}: {} {} {} => {}",
                        path, left_value, op, right_value, value
                    ));
                }
                value
            }
        }
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

/// 不带追踪的便捷求值入口
pub fn evaluate(node: &Node, record: &DataRecord) -> Value {
    Evaluator::new().execute(node, record).value
}

/// 解析叶子节点取值
///
/// 属性引用命中记录时取记录值，未命中时退化为属性名本身的字面量，
/// 数值和字符串字面量取自身。
fn resolve_operand(operand: &OperandValue, record: &DataRecord) -> Value {
    match operand {
        OperandValue::Attribute(name) => record
            .get(name)
            .cloned()
            .unwrap_or_else(|| Value::String(name.clone())),
        OperandValue::Number(n) => json!(n),
        OperandValue::Text(s) => Value::String(s.clone()),
    }
}

fn apply_operator(op: Operator, left: &Value, right: &Value) -> Value {
    let result = match op {
        Operator::And => truthy(left) && truthy(right),
        Operator::Or => truthy(left) || truthy(right),
        // 序比较先把两侧统一转数值，转不了的一侧变 NaN，比较必为 false
        Operator::Gt => coerce_number(left) > coerce_number(right),
        Operator::Lt => coerce_number(left) < coerce_number(right),
        Operator::Gte => coerce_number(left) >= coerce_number(right),
        Operator::Lte => coerce_number(left) <= coerce_number(right),
        Operator::Eq => loose_eq(left, right),
    };
    Value::Bool(result)
}

/// 布尔语境下的真值判定
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// 尝试把值转换为 f64（数值本身，或可解析为数值的字符串）
fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn coerce_number(value: &Value) -> f64 {
    as_f64(value).unwrap_or(f64::NAN)
}

/// 宽松相等
///
/// 两侧都能转数值时按数值比较（"100" 与 100 视为相等），否则按
/// 原始值比较。
fn loose_eq(left: &Value, right: &Value) -> bool {
    if let (Some(l), Some(r)) = (as_f64(left), as_f64(right)) {
        return (l - r).abs() < f64::EPSILON;
    }
    left == right
}
