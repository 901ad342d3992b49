//! The control loop: who acts next, the human or the agent.
//!
//! [`Agent::step`] runs one control turn over the session's ledgers and
//! returns a [`ControlState`]. The caller appends human input with
//! [`Agent::add_user_message`] and keeps calling `step` while it gets
//! [`ControlState::AgentControl`] back.
//!
//! One control turn, in order:
//! 1. No pending human request: hand control back.
//! 2. A new request is judged for relevance once, through a structured
//!    decision. Out-of-scope requests are settled without acting.
//! 3. Until a plan exists, the model is offered only `write_todos`. Any
//!    other tool request is rejected with a corrective message and the
//!    agent keeps control.
//! 4. With a plan, a fully completed plan hands control back without a
//!    model call. Otherwise the model gets the full tool set. Requested
//!    calls run in order; a failure counts against the retry budget, and
//!    once that is spent control goes back to the human.

pub mod decision;
pub mod retry;
pub mod turn;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use crate::config::Config;
use crate::constants::{
    DEFAULT_INSTRUCTIONS, DEFAULT_MAX_RETRIES, DEFAULT_RELEVANCE_THRESHOLD, PLAN_REQUIRED_CORRECTION,
    RETRY_KEY_TOOLS,
};
use crate::error::AgentError;
use crate::message::{Message, MessageLedger, Role, ToolCall};
use crate::output::Renderer;
use crate::provider::ModelGateway;
use crate::todo::TodoLedger;
use crate::tools::dispatch::Dispatched;
use crate::tools::todo_tools::WRITE_TODOS;
use crate::tools::{ToolDispatcher, ToolRegistry};

use retry::RetryTracker;
use turn::collect_turn;

/// Who must act next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    /// The human must provide input.
    UserControl,
    /// The loop should run another agent turn without new input.
    AgentControl,
}

#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub instructions: String,
    pub max_retries: u32,
    pub relevance_threshold: f64,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            relevance_threshold: DEFAULT_RELEVANCE_THRESHOLD,
        }
    }
}

impl AgentSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            instructions: config.instructions(),
            max_retries: config.max_retries(),
            relevance_threshold: config.relevance_threshold(),
        }
    }
}

/// The human request currently being worked on.
#[derive(Debug, Clone, Copy)]
struct PendingRequest {
    /// Ledger position of the human message.
    index: usize,
    /// Set once control has gone back to the human for this request.
    settled: bool,
}

/// One session's control state machine.
///
/// Owns every ledger it works on; nothing here is shared between sessions.
pub struct Agent {
    gateway: Arc<dyn ModelGateway>,
    settings: AgentSettings,
    ledger: MessageLedger,
    dispatcher: ToolDispatcher,
    retries: RetryTracker,
    plan_created: bool,
    pending: Option<PendingRequest>,
}

impl Agent {
    /// Starts a fresh session whose ledger opens with the instructions.
    pub fn new(gateway: Arc<dyn ModelGateway>, registry: ToolRegistry, settings: AgentSettings) -> Self {
        let mut ledger = MessageLedger::new();
        ledger.append(Message::system(settings.instructions.clone()));
        Self::assemble(gateway, registry, settings, ledger, TodoLedger::new(), false)
    }

    /// Rebuilds a session from its stored ledger and plan.
    ///
    /// The retry budget starts over.
    pub fn resume(
        gateway: Arc<dyn ModelGateway>,
        registry: ToolRegistry,
        settings: AgentSettings,
        messages: Vec<Message>,
        todos: TodoLedger,
        plan_created: bool,
    ) -> Self {
        let mut ledger = MessageLedger::from_messages(messages);
        if ledger.is_empty() {
            ledger.append(Message::system(settings.instructions.clone()));
        }
        Self::assemble(gateway, registry, settings, ledger, todos, plan_created)
    }

    fn assemble(
        gateway: Arc<dyn ModelGateway>,
        registry: ToolRegistry,
        settings: AgentSettings,
        ledger: MessageLedger,
        todos: TodoLedger,
        plan_created: bool,
    ) -> Self {
        let retries = RetryTracker::new(settings.max_retries);
        Self {
            gateway,
            dispatcher: ToolDispatcher::new(registry, todos),
            settings,
            ledger,
            retries,
            plan_created,
            pending: None,
        }
    }

    pub fn add_user_message(&mut self, text: impl Into<String>) {
        self.ledger.append(Message::user(text));
    }

    pub fn messages(&self) -> &[Message] {
        self.ledger.as_slice()
    }

    pub fn todos(&self) -> &TodoLedger {
        self.dispatcher.todos()
    }

    pub fn plan_created(&self) -> bool {
        self.plan_created
    }

    /// Runs one control turn.
    ///
    /// Tool failures never surface here; they are recorded in the ledger.
    /// Errors are backend failures and malformed relevance decisions.
    pub async fn step(&mut self, renderer: &mut dyn Renderer) -> Result<ControlState, AgentError> {
        let Some(index) = self.ledger.last_user_index() else {
            tracing::debug!("no human message yet");
            return Ok(ControlState::UserControl);
        };

        let pending = match self.pending {
            Some(pending) if pending.index == index => pending,
            _ => {
                let pending = self.open_request(index, renderer).await?;
                self.pending = Some(pending);
                pending
            }
        };
        if pending.settled {
            tracing::debug!(index, "pending request already settled");
            return Ok(ControlState::UserControl);
        }

        let state = if self.plan_created {
            self.execution_turn(renderer).await?
        } else {
            self.planning_turn(renderer).await?
        };

        if let Some(pending) = self.pending.as_mut() {
            pending.settled = state == ControlState::UserControl;
        }
        tracing::debug!(?state, plan_created = self.plan_created, "control turn finished");
        Ok(state)
    }

    /// Starts tracking the human message at `index`, judging relevance if
    /// the agent has not already answered it.
    async fn open_request(
        &mut self,
        index: usize,
        renderer: &mut dyn Renderer,
    ) -> Result<PendingRequest, AgentError> {
        let answered = self
            .ledger
            .since(index + 1)
            .iter()
            .any(|m| m.role == Role::Assistant);
        if answered {
            return Ok(PendingRequest {
                index,
                settled: true,
            });
        }

        let request = self.ledger.as_slice()[index].text().to_string();
        let decision =
            decision::decide(self.gateway.as_ref(), &self.settings.instructions, &request).await?;
        let relevant = decision.is_relevant(self.settings.relevance_threshold);
        if !relevant {
            tracing::info!(confidence = decision.confidence, "request judged out of scope");
            renderer.render_notice("This request is outside what I review; nothing to do.");
        }
        Ok(PendingRequest {
            index,
            settled: !relevant,
        })
    }

    /// The to-do gate: one turn in which only a plan may be written.
    async fn planning_turn(&mut self, renderer: &mut dyn Renderer) -> Result<ControlState, AgentError> {
        let tools = self.dispatcher.planning_definitions();
        let stream = self.gateway.chat(self.ledger.as_slice(), &tools).await?;
        let turn = collect_turn(stream, renderer).await?;
        self.ledger.append(turn.to_message());

        if !turn.has_tool_calls() {
            return Ok(ControlState::UserControl);
        }

        if turn.tool_calls.iter().any(|call| call.name() != WRITE_TODOS) {
            let requested: Vec<&str> = turn.tool_calls.iter().map(ToolCall::name).collect();
            tracing::warn!(?requested, "tool requested before a plan exists");
            self.ledger.append(Message::system(PLAN_REQUIRED_CORRECTION));
            renderer.render_notice("A plan is required first; asked the model to write one.");
            return Ok(ControlState::AgentControl);
        }

        // A failed plan is reported in the ledger; the next turn plans again.
        let outcomes = self.dispatcher.dispatch_batch(&turn.tool_calls).await;
        self.plan_created = outcomes.iter().any(|o| o.result.is_ok());
        self.record_outcomes(&turn.tool_calls, outcomes, renderer);
        Ok(ControlState::AgentControl)
    }

    /// Main execution: one turn with the full tool set.
    async fn execution_turn(&mut self, renderer: &mut dyn Renderer) -> Result<ControlState, AgentError> {
        if self.dispatcher.todos().is_complete() {
            tracing::debug!("every to-do item is complete");
            return Ok(ControlState::UserControl);
        }

        let stream = self
            .gateway
            .chat(self.ledger.as_slice(), self.dispatcher.definitions())
            .await?;
        let turn = collect_turn(stream, renderer).await?;
        self.ledger.append(turn.to_message());

        if !turn.has_tool_calls() {
            return Ok(ControlState::UserControl);
        }

        let outcomes = self.dispatcher.dispatch_batch(&turn.tool_calls).await;
        if self.record_outcomes(&turn.tool_calls, outcomes, renderer) {
            Ok(ControlState::AgentControl)
        } else {
            Ok(self.after_failure(RETRY_KEY_TOOLS, renderer))
        }
    }

    /// Appends one tool message per attempted call. True if none failed.
    fn record_outcomes(
        &mut self,
        calls: &[ToolCall],
        outcomes: Vec<Dispatched>,
        renderer: &mut dyn Renderer,
    ) -> bool {
        let mut all_ok = true;
        for (call, outcome) in calls.iter().zip(outcomes) {
            renderer.render_tool(call, &outcome.result);
            all_ok &= outcome.result.is_ok();
            self.ledger
                .append(Message::tool_result(outcome.tool_name, outcome.result.to_message_content()));
        }
        all_ok
    }

    /// Consults the retry budget for `key` after a failed turn.
    fn after_failure(&mut self, key: &str, renderer: &mut dyn Renderer) -> ControlState {
        if self.retries.should_retry(key) {
            let attempt = self.retries.record_attempt(key);
            tracing::debug!(key, attempt, max = self.retries.max_retries(), "retrying");
            ControlState::AgentControl
        } else {
            tracing::warn!(key, max = self.retries.max_retries(), "retry budget exhausted");
            renderer.render_notice(&format!(
                "Stopped after {} failed attempts; waiting for your input.",
                self.retries.max_retries()
            ));
            ControlState::UserControl
        }
    }
}
