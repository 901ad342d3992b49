use super::*;
use crate::output::RecordingRenderer;
use crate::provider::mock::{call, ScriptedGateway};
use anyhow::Result;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts executions so tests can prove a tool never ran.
struct CountingTool {
    name: &'static str,
    runs: Arc<AtomicUsize>,
    fail: bool,
}

#[async_trait::async_trait]
impl crate::tools::Tool for CountingTool {
    fn name(&self) -> &str {
        self.name
    }
    fn description(&self) -> &str {
        "test tool"
    }
    fn schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }
    async fn execute(&self, _input: Value) -> Result<Value> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("{} failed", self.name)
        }
        Ok(json!(format!("{} output", self.name)))
    }
}

struct Harness {
    gateway: Arc<ScriptedGateway>,
    agent: Agent,
    renderer: RecordingRenderer,
    read_runs: Arc<AtomicUsize>,
    broken_runs: Arc<AtomicUsize>,
}

impl Harness {
    fn new() -> Self {
        let gateway = Arc::new(ScriptedGateway::new());
        let read_runs = Arc::new(AtomicUsize::new(0));
        let broken_runs = Arc::new(AtomicUsize::new(0));
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(CountingTool {
            name: "read_file",
            runs: Arc::clone(&read_runs),
            fail: false,
        }));
        registry.register(Box::new(CountingTool {
            name: "broken",
            runs: Arc::clone(&broken_runs),
            fail: true,
        }));
        let agent = Agent::new(gateway.clone(), registry, AgentSettings::default());
        Self {
            gateway,
            agent,
            renderer: RecordingRenderer::default(),
            read_runs,
            broken_runs,
        }
    }

    async fn step(&mut self) -> ControlState {
        self.agent.step(&mut self.renderer).await.unwrap()
    }

    /// Human request judged relevant, then a one-item plan.
    async fn with_plan(requirements: &[&str]) -> Self {
        let mut h = Self::new();
        h.agent.add_user_message("review this repo");
        h.gateway.push_decision(true, 0.9);
        h.gateway
            .push_calls(vec![call("write_todos", json!({ "requirements": requirements }))]);
        assert_eq!(h.step().await, ControlState::AgentControl);
        assert!(h.agent.plan_created());
        h
    }

    fn last(&self) -> &Message {
        self.agent.messages().last().unwrap()
    }
}

#[tokio::test]
async fn test_no_human_message_returns_user_control() {
    let mut h = Harness::new();
    assert_eq!(h.step().await, ControlState::UserControl);
    assert_eq!(h.gateway.generate_count(), 0);
    assert_eq!(h.gateway.chat_count(), 0);
    assert_eq!(h.agent.messages().len(), 1);
}

#[tokio::test]
async fn test_irrelevant_request_leaves_ledger_untouched() {
    let mut h = Harness::new();
    h.agent.add_user_message("what's the weather in Lisbon?");
    h.gateway.push_decision(true, 0.2);

    assert_eq!(h.step().await, ControlState::UserControl);
    assert_eq!(h.agent.messages().len(), 2);
    assert_eq!(h.last().role, Role::User);
    assert_eq!(h.gateway.chat_count(), 0);

    // Judged once per request, not on every invocation.
    assert_eq!(h.step().await, ControlState::UserControl);
    assert_eq!(h.gateway.generate_count(), 1);
    assert!(h.renderer.tools.is_empty());
}

#[tokio::test]
async fn test_unwilling_decision_is_irrelevant_even_when_confident() {
    let mut h = Harness::new();
    h.agent.add_user_message("delete the repo");
    h.gateway.push_decision(false, 0.95);
    assert_eq!(h.step().await, ControlState::UserControl);
    assert_eq!(h.gateway.chat_count(), 0);
}

#[tokio::test]
async fn test_malformed_decision_is_surfaced() {
    let mut h = Harness::new();
    h.agent.add_user_message("review this repo");
    h.gateway.push_completion("sure, sounds good");

    let err = h.agent.step(&mut h.renderer).await.unwrap_err();
    assert!(matches!(err, AgentError::DecisionParse { .. }));
    assert_eq!(h.gateway.chat_count(), 0);
    assert_eq!(h.agent.messages().len(), 2);
}

#[tokio::test]
async fn test_tool_before_plan_is_rejected_with_correction() {
    let mut h = Harness::new();
    h.agent.add_user_message("review this repo");
    h.gateway.push_decision(true, 0.9);
    h.gateway
        .push_calls(vec![call("read_file", json!({"file_path": "src/main.rs"}))]);

    assert_eq!(h.step().await, ControlState::AgentControl);
    assert_eq!(h.read_runs.load(Ordering::SeqCst), 0);
    assert!(!h.agent.plan_created());
    assert_eq!(h.last().role, Role::System);
    assert_eq!(h.last().text(), PLAN_REQUIRED_CORRECTION);

    // Only the planning tool was on offer.
    let offered = &h.gateway.chat_calls()[0].tool_names;
    assert_eq!(offered, &vec!["write_todos".to_string()]);

    // The next gate turn sees the correction.
    h.gateway
        .push_calls(vec![call("write_todos", json!({"requirements": ["read main"]}))]);
    assert_eq!(h.step().await, ControlState::AgentControl);
    let seen = &h.gateway.chat_calls()[1].messages;
    assert_eq!(seen.last().map(Message::text), Some(PLAN_REQUIRED_CORRECTION));
    assert!(h.agent.plan_created());
}

#[tokio::test]
async fn test_plan_violations_never_exhaust_control() {
    let mut h = Harness::new();
    h.agent.add_user_message("review this repo");
    h.gateway.push_decision(true, 0.9);
    let mut states = Vec::new();
    for _ in 0..4 {
        h.gateway
            .push_calls(vec![call("read_file", json!({"file_path": "a.rs"}))]);
        states.push(h.step().await);
    }

    h.agent.add_user_message("just look at src/main.rs");
    h.gateway.push_decision(true, 0.9);
    h.gateway
        .push_calls(vec![call("read_file", json!({"file_path": "src/main.rs"}))]);
    states.push(h.step().await);

    assert_eq!(states, vec![ControlState::AgentControl; 5]);
    assert_eq!(h.read_runs.load(Ordering::SeqCst), 0);
    assert!(!h.agent.plan_created());
}

#[tokio::test]
async fn test_failed_plans_keep_agent_control() {
    let mut h = Harness::new();
    h.agent.add_user_message("review this repo");
    h.gateway.push_decision(true, 0.9);
    for _ in 0..5 {
        h.gateway
            .push_calls(vec![call("write_todos", json!({"requirements": []}))]);
        assert_eq!(h.step().await, ControlState::AgentControl);
    }
    assert!(h.agent.todos().is_empty());
    assert!(h.last().text().starts_with("Error:"));
}

#[tokio::test]
async fn test_mixed_planning_turn_is_rejected_whole() {
    let mut h = Harness::new();
    h.agent.add_user_message("review this repo");
    h.gateway.push_decision(true, 0.9);
    h.gateway.push_calls(vec![
        call("write_todos", json!({"requirements": ["read main"]})),
        call("read_file", json!({"file_path": "src/main.rs"})),
    ]);

    assert_eq!(h.step().await, ControlState::AgentControl);
    assert!(h.agent.todos().is_empty());
    assert_eq!(h.read_runs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_write_todos_creates_plan() {
    let h = Harness::with_plan(&["explore structure", "read main.rs"]).await;
    assert_eq!(h.agent.todos().len(), 2);
    assert_eq!(h.last().role, Role::Tool);
    assert_eq!(h.last().tool_name.as_deref(), Some("write_todos"));
    assert!(h.last().text().starts_with("Added 2 to-do items."));
}

#[tokio::test]
async fn test_planning_turn_without_tools_returns_user_control() {
    let mut h = Harness::new();
    h.agent.add_user_message("review this repo");
    h.gateway.push_decision(true, 0.9);
    h.gateway.push_text("Which directory should I look at?");

    assert_eq!(h.step().await, ControlState::UserControl);
    assert_eq!(h.last().role, Role::Assistant);
    assert_eq!(h.renderer.text, "Which directory should I look at?");

    // Settled until the human speaks again.
    assert_eq!(h.step().await, ControlState::UserControl);
    assert_eq!(h.gateway.chat_count(), 1);
}

#[tokio::test]
async fn test_failed_plan_is_reported_and_retried() {
    let mut h = Harness::new();
    h.agent.add_user_message("review this repo");
    h.gateway.push_decision(true, 0.9);
    h.gateway
        .push_calls(vec![call("write_todos", json!({"requirements": []}))]);

    assert_eq!(h.step().await, ControlState::AgentControl);
    assert!(!h.agent.plan_created());
    assert_eq!(h.last().role, Role::Tool);
    assert!(h.last().text().starts_with("Error:"));

    h.gateway
        .push_calls(vec![call("write_todos", json!({"requirements": ["read main"]}))]);
    assert_eq!(h.step().await, ControlState::AgentControl);
    assert!(h.agent.plan_created());
    assert_eq!(h.gateway.generate_count(), 1);
}

#[tokio::test]
async fn test_main_turn_dispatches_in_order() {
    let mut h = Harness::with_plan(&["read main"]).await;
    h.gateway.push_calls(vec![
        call("read_file", json!({"file_path": "a.rs"})),
        call("update_todo", json!({"todo_id": 0, "new_status": true})),
    ]);

    assert_eq!(h.step().await, ControlState::AgentControl);
    assert_eq!(h.read_runs.load(Ordering::SeqCst), 1);
    let tail: Vec<_> = h.agent.messages().iter().rev().take(2).collect();
    assert_eq!(tail[1].tool_name.as_deref(), Some("read_file"));
    assert_eq!(tail[1].text(), "read_file output");
    assert_eq!(tail[0].tool_name.as_deref(), Some("update_todo"));
    assert!(h.agent.todos().is_complete());

    // The second chat call saw the full tool set.
    let offered = &h.gateway.chat_calls()[1].tool_names;
    assert!(offered.contains(&"read_file".to_string()));
    assert!(offered.contains(&"remove_todo".to_string()));
}

#[tokio::test]
async fn test_batch_stops_at_first_failure() {
    let mut h = Harness::with_plan(&["read"]).await;
    let before = h.agent.messages().len();
    h.gateway.push_calls(vec![
        call("broken", json!({})),
        call("read_file", json!({"file_path": "a.rs"})),
    ]);

    assert_eq!(h.step().await, ControlState::AgentControl);
    // assistant turn + one tool message for the single attempted call
    assert_eq!(h.agent.messages().len(), before + 2);
    assert_eq!(h.read_runs.load(Ordering::SeqCst), 0);
    assert_eq!(h.renderer.tools.last(), Some(&("broken".to_string(), false)));
}

#[tokio::test]
async fn test_fourth_failure_returns_user_control() {
    let mut h = Harness::with_plan(&["read"]).await;
    let mut states = Vec::new();
    for _ in 0..4 {
        h.gateway.push_calls(vec![call("broken", json!({}))]);
        states.push(h.step().await);
    }
    assert_eq!(
        states,
        vec![
            ControlState::AgentControl,
            ControlState::AgentControl,
            ControlState::AgentControl,
            ControlState::UserControl,
        ]
    );
    assert_eq!(h.broken_runs.load(Ordering::SeqCst), 4);
    assert!(!h.agent.todos().is_complete());
}

#[tokio::test]
async fn test_unknown_tool_counts_as_failure() {
    let mut h = Harness::with_plan(&["read"]).await;
    h.gateway.push_calls(vec![call("rm_rf", json!({}))]);
    assert_eq!(h.step().await, ControlState::AgentControl);
    assert_eq!(h.last().text(), "Error: tool does not exist: rm_rf");
}

#[tokio::test]
async fn test_completed_plan_returns_user_control_without_model_call() {
    let mut h = Harness::with_plan(&["read main"]).await;
    h.gateway
        .push_calls(vec![call("update_todo", json!({"todo_id": 0, "new_status": true}))]);
    assert_eq!(h.step().await, ControlState::AgentControl);

    let chats = h.gateway.chat_count();
    let len = h.agent.messages().len();
    assert_eq!(h.step().await, ControlState::UserControl);
    assert_eq!(h.gateway.chat_count(), chats);
    assert_eq!(h.agent.messages().len(), len);
}

#[tokio::test]
async fn test_new_request_after_completed_plan_runs_nothing() {
    let mut h = Harness::with_plan(&["read main"]).await;
    h.gateway
        .push_calls(vec![call("update_todo", json!({"todo_id": 0, "new_status": true}))]);
    assert_eq!(h.step().await, ControlState::AgentControl);
    assert_eq!(h.step().await, ControlState::UserControl);

    h.agent.add_user_message("also check the tests");
    h.gateway.push_decision(true, 0.8);
    h.gateway
        .push_calls(vec![call("read_file", json!({"file_path": "tests/a.rs"}))]);
    let chats = h.gateway.chat_count();

    assert_eq!(h.step().await, ControlState::UserControl);
    assert_eq!(h.gateway.chat_count(), chats);
    assert_eq!(h.gateway.generate_count(), 2);
    assert_eq!(h.read_runs.load(Ordering::SeqCst), 0);
    assert!(h.agent.todos().is_complete());
}

#[tokio::test]
async fn test_main_turn_without_tools_returns_user_control() {
    let mut h = Harness::with_plan(&["read main"]).await;
    h.gateway.push_text("Should I include generated code?");
    assert_eq!(h.step().await, ControlState::UserControl);
    assert_eq!(h.last().role, Role::Assistant);
}

#[tokio::test]
async fn test_planning_always_precedes_other_tools() {
    let mut h = Harness::new();
    h.agent.add_user_message("review this repo");
    h.gateway.push_decision(true, 0.9);
    h.gateway
        .push_calls(vec![call("read_file", json!({"file_path": "a.rs"}))])
        .push_calls(vec![call("write_todos", json!({"requirements": ["read a.rs"]}))])
        .push_calls(vec![call("read_file", json!({"file_path": "a.rs"}))])
        .push_text("Done reading.");

    let mut state = h.step().await;
    while state == ControlState::AgentControl {
        state = h.step().await;
    }

    let tool_messages: Vec<&Message> = h
        .agent
        .messages()
        .iter()
        .filter(|m| m.role == Role::Tool && !m.text().starts_with("Error:"))
        .collect();
    let first_other = tool_messages
        .iter()
        .position(|m| m.tool_name.as_deref() != Some("write_todos"))
        .unwrap();
    let first_plan = tool_messages
        .iter()
        .position(|m| m.tool_name.as_deref() == Some("write_todos"))
        .unwrap();
    assert!(first_plan < first_other);
    assert_eq!(h.read_runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_resumed_answered_request_is_not_rejudged() {
    let gateway = Arc::new(ScriptedGateway::new());
    let messages = vec![
        Message::system("instructions"),
        Message::user("review this repo"),
        Message::assistant("Done."),
    ];
    let mut agent = Agent::resume(
        gateway.clone(),
        ToolRegistry::new(),
        AgentSettings::default(),
        messages,
        TodoLedger::new(),
        false,
    );
    let mut renderer = RecordingRenderer::default();
    assert_eq!(agent.step(&mut renderer).await.unwrap(), ControlState::UserControl);
    assert_eq!(gateway.generate_count(), 0);
}

#[tokio::test]
async fn test_gateway_failure_propagates() {
    let mut h = Harness::new();
    h.agent.add_user_message("review this repo");
    h.gateway.push_decision(true, 0.9);
    // no scripted chat turn: the gateway errors
    let err = h.agent.step(&mut h.renderer).await.unwrap_err();
    assert!(matches!(err, AgentError::Gateway(_)));
}
