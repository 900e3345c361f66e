use dagcore::{
    EventBus, ExecutionEvent, ExecutionId, Node, NodeContext, NodeError, NodeEvent, NodeInstance,
    Value, WorkflowGraph,
};
use dagnodes::{
    ArithmeticNode, ConcatNode, DebugNode, DelayNode, HttpRequestNode, JsonParseNode,
    JsonStringifyNode,
};
use dagruntime::{RuntimeConfig, WorkflowRuntime};
use std::sync::Arc;
use std::time::Duration;

// Helper function to create a test context
fn create_test_context(bus: &EventBus, inputs: &[(&str, Value)]) -> NodeContext {
    let execution_id = ExecutionId::new_v4();
    inputs.iter().fold(
        NodeContext::new("test", bus.create_emitter(execution_id, "test")),
        |ctx, (name, value)| ctx.with_input(*name, value.clone()),
    )
}

fn number(output: &dagcore::NodeOutput, port: &str) -> f64 {
    output.outputs.get(port).and_then(|v| v.as_f64()).unwrap()
}

#[tokio::test]
async fn test_arithmetic_nodes() {
    let bus = EventBus::new(16);
    let inputs = [("x", Value::from(6.0)), ("y", Value::from(3.0))];

    let cases = [
        (ArithmeticNode::add(), 9.0),
        (ArithmeticNode::subtract(), 3.0),
        (ArithmeticNode::multiply(), 18.0),
        (ArithmeticNode::divide(), 2.0),
    ];

    for (node, expected) in cases {
        let output = node.execute(create_test_context(&bus, &inputs)).await.unwrap();
        assert_eq!(number(&output, "out"), expected, "{}", node.node_type());
    }
}

#[tokio::test]
async fn test_divide_by_zero_fails() {
    let bus = EventBus::new(16);
    let ctx = create_test_context(&bus, &[("x", Value::from(1.0)), ("y", Value::from(0.0))]);

    let err = ArithmeticNode::divide().execute(ctx).await.unwrap_err();
    assert_eq!(err, NodeError::ExecutionFailed("division by zero".to_string()));
}

#[tokio::test]
async fn test_arithmetic_rejects_text() {
    let bus = EventBus::new(16);
    let ctx = create_test_context(&bus, &[("x", Value::from("six")), ("y", Value::from(1.0))]);

    let err = ArithmeticNode::add().execute(ctx).await.unwrap_err();
    assert!(matches!(err, NodeError::InvalidInputType { ref field, .. } if field == "x"));
}

#[tokio::test]
async fn test_json_parse_and_stringify() {
    let bus = EventBus::new(16);

    let ctx = create_test_context(&bus, &[("json", Value::from(r#"{"a": [1, 2]}"#))]);
    let parsed = JsonParseNode::new().execute(ctx).await.unwrap();
    let value = parsed.outputs.get("parsed").cloned().unwrap();
    assert_eq!(value.as_object().unwrap()["a"].as_array().unwrap().len(), 2);

    let ctx = create_test_context(&bus, &[("value", value)]);
    let stringified = JsonStringifyNode::new().execute(ctx).await.unwrap();
    assert_eq!(
        stringified.outputs.get("json").and_then(|v| v.as_str()),
        Some(r#"{"a":[1,2]}"#)
    );
}

#[tokio::test]
async fn test_json_parse_rejects_garbage() {
    let bus = EventBus::new(16);
    let ctx = create_test_context(&bus, &[("json", Value::from("{not json"))]);

    let err = JsonParseNode::new().execute(ctx).await.unwrap_err();
    assert!(matches!(err, NodeError::ExecutionFailed(_)));
}

#[tokio::test]
async fn test_concat_uses_separator() {
    let bus = EventBus::new(16);
    let ctx = create_test_context(
        &bus,
        &[
            ("a", Value::from("total")),
            ("b", Value::from(20.0)),
            ("separator", Value::from(": ")),
        ],
    );

    let output = ConcatNode::new().execute(ctx).await.unwrap();
    assert_eq!(output.outputs.get("text").and_then(|v| v.as_str()), Some("total: 20"));
}

#[tokio::test]
async fn test_debug_emits_info_event() {
    let bus = EventBus::new(16);
    let mut events = bus.subscribe();
    let ctx = create_test_context(&bus, &[("message", Value::from("hello"))]);

    let output = DebugNode::new().execute(ctx).await.unwrap();
    assert_eq!(output.outputs.get("message"), Some(&Value::from("hello")));

    match events.try_recv().unwrap() {
        ExecutionEvent::NodeEvent {
            event: NodeEvent::Info { message },
            ..
        } => assert_eq!(message, "DEBUG: hello"),
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn test_delay_passes_value_through() {
    let bus = EventBus::new(16);
    let ctx = create_test_context(
        &bus,
        &[("delay_ms", Value::from(5.0)), ("value", Value::from(true))],
    );

    let output = DelayNode::new().execute(ctx).await.unwrap();
    assert_eq!(output.outputs.get("value"), Some(&Value::Bool(true)));
}

#[tokio::test]
async fn test_delay_honours_cancellation() {
    let bus = EventBus::new(16);
    let ctx = create_test_context(&bus, &[("delay_ms", Value::from(60_000.0))]);
    let token = ctx.cancellation.clone();

    let handle = tokio::spawn(async move { DelayNode::new().execute(ctx).await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    token.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("delay should stop after cancel")
        .unwrap();
    assert_eq!(result.unwrap_err(), NodeError::Cancelled);
}

#[tokio::test]
async fn test_http_rejects_unknown_method() {
    let bus = EventBus::new(16);
    let ctx = create_test_context(
        &bus,
        &[
            ("url", Value::from("http://localhost:1")),
            ("method", Value::from("TELEPORT")),
        ],
    );

    let err = HttpRequestNode::new().execute(ctx).await.unwrap_err();
    assert!(matches!(err, NodeError::Configuration(_)));
}

#[test]
fn test_standard_descriptors_are_consistent() {
    let registry = dagnodes::standard_registry();

    assert_eq!(registry.len(), 10);
    assert!(registry.check_descriptors().is_empty());
    assert!(registry.list_node_types().contains(&"math.add".to_string()));

    let delay = registry.get_descriptor("time.delay").unwrap();
    let params = delay.categorized_parameters();
    assert!(params.basic.is_empty());
    assert_eq!(params.advanced.len(), 2);
}

#[tokio::test]
async fn test_add_then_multiply_workflow() {
    let runtime = WorkflowRuntime::with_registry(
        Arc::new(dagnodes::standard_registry()),
        RuntimeConfig::default(),
    );

    let mut workflow = WorkflowGraph::new();
    workflow.add_node(
        NodeInstance::new("A", "math.add")
            .with_param("x", 2.0)
            .with_param("y", 3.0),
    );
    workflow.add_node(NodeInstance::new("B", "math.multiply").with_param("y", 4.0));
    workflow.connect("A", "out", "B", "x");

    let run = runtime.execute(&workflow).await.unwrap();

    assert_eq!(
        run.report.schedule.batches(),
        &[vec!["A".to_string()], vec!["B".to_string()]]
    );
    assert_eq!(run.report.output("A", "out"), Some(&Value::from(5.0)));
    let terminal = run.outputs["B"].outputs().unwrap();
    assert_eq!(terminal["out"], Value::from(20.0));
}

#[tokio::test]
async fn test_parse_failure_skips_downstream() {
    let runtime = WorkflowRuntime::with_registry(
        Arc::new(dagnodes::standard_registry()),
        RuntimeConfig::default(),
    );

    let mut workflow = WorkflowGraph::new();
    workflow.add_node(
        NodeInstance::new("parse", "transform.json_parse").with_param("json", "{oops"),
    );
    workflow.add_node(NodeInstance::new("log", "debug.log"));
    workflow.add_node(
        NodeInstance::new("text", "text.concat")
            .with_param("a", "x")
            .with_param("b", "y"),
    );
    workflow.connect("parse", "parsed", "log", "message");

    let run = runtime.execute(&workflow).await.unwrap();

    assert_eq!(run.report.failed(), vec!["parse"]);
    assert_eq!(run.report.skipped(), vec!["log"]);
    assert_eq!(
        run.outputs["text"].outputs().unwrap()["text"],
        Value::from("xy")
    );
}
