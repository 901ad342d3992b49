//! Assembly of one streamed model turn.
//!
//! A turn is opened by the gateway and pulled delta by delta until the
//! backend marks it done or the stream ends. Content fragments are
//! concatenated and tool calls collected, both in arrival order.

use futures::StreamExt;

use crate::message::{Message, ToolCall};
use crate::output::Renderer;
use crate::provider::{ChatStream, GatewayError};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssembledTurn {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

impl AssembledTurn {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    pub fn to_message(&self) -> Message {
        Message::assistant_with_tools(self.content.clone(), self.tool_calls.clone())
    }
}

/// Drains `stream` into a single turn, echoing content as it arrives.
pub async fn collect_turn(
    mut stream: ChatStream,
    renderer: &mut dyn Renderer,
) -> Result<AssembledTurn, GatewayError> {
    let mut turn = AssembledTurn::default();
    while let Some(delta) = stream.next().await {
        let delta = match delta {
            Ok(delta) => delta,
            Err(e) => {
                renderer.render_done();
                return Err(e);
            }
        };
        if !delta.content.is_empty() {
            renderer.render_token(&delta.content);
            turn.content.push_str(&delta.content);
        }
        turn.tool_calls.extend(delta.tool_calls);
        if delta.done {
            break;
        }
    }
    renderer.render_done();
    tracing::debug!(
        content_len = turn.content.len(),
        tool_calls = turn.tool_calls.len(),
        "turn assembled"
    );
    Ok(turn)
}
