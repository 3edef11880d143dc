//! 规则引擎集成测试
//!
//! 覆盖完整工作流：创建规则、组合规则、求值、目录校验、修改规则，
//! 以及序列化往返不变式。

use rule_engine::{
    AttributeCatalog, AttributeType, CombinePolicy, CombineRequest, CreateRuleRequest, DataRecord,
    EvaluateRequest, Evaluator, MemoryRuleStorage, Node, NodePatch, Operator, RuleError,
    RuleService, StaticCatalog,
};
use serde_json::json;
use std::sync::Arc;

/// 初始化测试日志输出（重复调用安全）
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();
}

fn employee_catalog() -> AttributeCatalog {
    AttributeCatalog::from([
        ("age".to_string(), AttributeType::Number),
        ("salary".to_string(), AttributeType::Number),
        ("experience".to_string(), AttributeType::Number),
        ("department".to_string(), AttributeType::String),
        ("is_manager".to_string(), AttributeType::Boolean),
    ])
}

fn build_service() -> RuleService {
    init_tracing();
    RuleService::new(
        Arc::new(MemoryRuleStorage::new()),
        Arc::new(StaticCatalog::new(employee_catalog())),
    )
}

// ==================== 完整工作流测试 ====================

#[tokio::test]
async fn test_full_workflow() -> anyhow::Result<()> {
    let service = build_service();

    // 1. 创建两条规则
    let senior_sales = service
        .create_rule(CreateRuleRequest {
            name: "senior_sales".to_string(),
            rule_string: "(age > 30 AND department = 'Sales') OR (age < 25 AND department = 'Marketing')"
                .to_string(),
        })
        .await?;

    let well_paid = service
        .create_rule(CreateRuleRequest {
            name: "well_paid".to_string(),
            rule_string: "salary > 50000 OR experience > 5".to_string(),
        })
        .await?;

    assert_eq!(service.list_rules().await?.len(), 2);

    // 2. 组合为一条规则
    let combined = service
        .combine_rules(CombineRequest {
            rule_ids: vec![senior_sales.id.clone(), well_paid.id.clone()],
            rule_strings: vec![],
            policy: CombinePolicy::SequentialAnd,
        })
        .await?;

    // 3. 对组合结果求值
    let response = service
        .evaluate(EvaluateRequest {
            rule_id: None,
            rule_string: Some(combined.rule_string.clone()),
            data: json!({
                "age": 35,
                "department": "Sales",
                "salary": 60000,
                "experience": 3
            }),
        })
        .await?;
    assert!(response.result);

    let response = service
        .evaluate(EvaluateRequest {
            rule_id: None,
            rule_string: Some(combined.rule_string),
            data: json!({
                "age": 28,
                "department": "Sales",
                "salary": 40000,
                "experience": 2
            }),
        })
        .await?;
    assert!(!response.result);

    // 4. 修改第一条规则并重新求值
    let updated = service
        .modify_rule(
            &senior_sales.id,
            NodePatch {
                left: Some(Box::new(NodePatch {
                    left: Some(Box::new(NodePatch {
                        op: Some(Operator::Gte),
                        ..Default::default()
                    })),
                    ..Default::default()
                })),
                ..Default::default()
            },
        )
        .await?;
    assert!(updated.rule_string.contains(">="));

    let response = service
        .evaluate(EvaluateRequest {
            rule_id: Some(senior_sales.id),
            rule_string: None,
            data: json!({"age": 30, "department": "Sales"}),
        })
        .await?;
    assert!(response.result);

    Ok(())
}

// ==================== 求值场景测试 ====================

#[tokio::test]
async fn test_evaluate_stored_rule_by_id() {
    let service = build_service();

    let record = service
        .create_rule(CreateRuleRequest {
            name: "adult".to_string(),
            rule_string: "age > 30".to_string(),
        })
        .await
        .unwrap();

    let response = service
        .evaluate(EvaluateRequest {
            rule_id: Some(record.id.clone()),
            rule_string: None,
            data: json!({"age": 35}),
        })
        .await
        .unwrap();
    assert!(response.result);
    assert!(response.evaluation_time_ms >= 0);

    let response = service
        .evaluate(EvaluateRequest {
            rule_id: Some(record.id),
            rule_string: None,
            data: json!({"age": 20}),
        })
        .await
        .unwrap();
    assert!(!response.result);
}

#[tokio::test]
async fn test_evaluation_trace_is_exposed() {
    let service = build_service();

    let response = service
        .evaluate(EvaluateRequest {
            rule_id: None,
            rule_string: Some("age > 30 AND department = 'Sales'".to_string()),
            data: json!({"age": 35, "department": "Sales"}),
        })
        .await
        .unwrap();

    assert!(response.result);
    assert!(response.trace.iter().any(|line| line.contains("AND")));
}

// ==================== 组合策略测试 ====================

#[tokio::test]
async fn test_combine_policies_differ() {
    let service = build_service();
    let rules = vec![
        "age > 30 AND department = 'Sales'".to_string(),
        "salary > 50000 AND experience > 5".to_string(),
    ];

    let and_fold = service
        .combine_rules(CombineRequest {
            rule_ids: vec![],
            rule_strings: rules.clone(),
            policy: CombinePolicy::SequentialAnd,
        })
        .await
        .unwrap();
    assert_eq!(and_fold.ast.as_ref().unwrap().value, "AND");

    // 操作符统计: AND x2, > x3, = x1 => 高频策略选出比较操作符 >
    // 作为两棵规则树之间的连接符
    let elected = service
        .combine_rules(CombineRequest {
            rule_ids: vec![],
            rule_strings: rules,
            policy: CombinePolicy::MostFrequentOperator,
        })
        .await
        .unwrap();
    assert_eq!(elected.ast.as_ref().unwrap().value, ">");
}

#[tokio::test]
async fn test_combined_rule_round_trips_through_storage() {
    let service = build_service();

    let combined = service
        .combine_rules(CombineRequest {
            rule_ids: vec![],
            rule_strings: vec!["age > 30".to_string(), "salary > 50000".to_string()],
            policy: CombinePolicy::SequentialAnd,
        })
        .await
        .unwrap();

    // 组合结果可以作为新规则存回去再求值
    let record = service
        .create_rule(CreateRuleRequest {
            name: "combined".to_string(),
            rule_string: combined.rule_string,
        })
        .await
        .unwrap();

    let response = service
        .evaluate(EvaluateRequest {
            rule_id: Some(record.id),
            rule_string: None,
            data: json!({"age": 35, "salary": 60000}),
        })
        .await
        .unwrap();
    assert!(response.result);
}

// ==================== 序列化往返测试 ====================

#[test]
fn test_parse_expression_round_trip() {
    let rules = [
        "age > 30",
        "department = 'Sales'",
        "age > 30 AND department = 'Sales'",
        "(age > 30 AND department = 'Sales') OR (age < 25 AND department = 'Marketing')",
    ];

    for rule in rules {
        let ast = rule_engine::parse_rule(rule).unwrap();
        let reparsed = rule_engine::parse_rule(&ast.expression()).unwrap();
        assert_eq!(&*reparsed, &*ast, "round trip failed for: {}", rule);
    }
}

#[test]
fn test_plain_tree_round_trip() {
    let ast = rule_engine::parse_rule(
        "(age > 30 AND department = 'Sales') OR (salary >= 50000 AND is_manager = 'true')",
    )
    .unwrap();

    let plain = ast.to_plain();
    let json = serde_json::to_string(&plain).unwrap();
    let parsed: rule_engine::PlainNode = serde_json::from_str(&json).unwrap();
    let revived = Node::from_plain(&parsed).unwrap();

    assert_eq!(&*revived, &*ast);
}

// ==================== 校验测试 ====================

#[tokio::test]
async fn test_validate_against_catalog() {
    let service = build_service();

    assert!(service
        .validate_rule("age > 30 AND department = 'Sales'")
        .await
        .is_ok());

    let err = service
        .validate_rule("age > 30 AND title = 'VP'")
        .await
        .unwrap_err();
    match err {
        RuleError::AttributeNotInCatalog { attribute, path } => {
            assert_eq!(attribute, "title");
            assert!(path.starts_with("root."));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

// ==================== 求值器直接使用测试 ====================

#[test]
fn test_evaluator_without_service() {
    let ast = rule_engine::parse_rule("age > 30 AND department = 'Sales'").unwrap();
    let record = DataRecord::new(json!({"age": 35, "department": "Sales"}));

    let outcome = Evaluator::new().with_trace().execute(&ast, &record);
    assert!(outcome.result);
    assert!(!outcome.trace.is_empty());
}
