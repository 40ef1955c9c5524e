//! The per-turn orchestration loop.
//!
//! `AwaitingInput -> FetchingVocabulary -> Reasoning -> AwaitingContinue`,
//! then back to `AwaitingInput` on an exact `"y"` or on to `Terminal`.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::agent_loop::AgentLoop;
use crate::error::AgentError;
use crate::types::{AgentEvent, Message};
use crate::vocabulary::{self, VocabularyConstraint, VocabularySource};

pub const QUESTION_PROMPT: &str = "What would you like to know? ";
pub const CONTINUE_PROMPT: &str = "would you like to ask another question? (y/n) ";

/// Longest tool output echoed to the console.
const TOOL_PREVIEW_CHARS: usize = 200;

/// Line-oriented user I/O.
pub trait Console {
    /// Block for one line. `None` means the user closed the input (EOF or
    /// interrupt).
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>, AgentError>;

    fn write_line(&mut self, line: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    AwaitingInput,
    FetchingVocabulary {
        question: String,
    },
    Reasoning {
        question: String,
        vocabulary: VocabularyConstraint,
    },
    AwaitingContinue,
    Terminal,
}

/// Only an exact, case-sensitive `"y"` asks for another round.
pub fn wants_another(answer: &str) -> bool {
    answer == "y"
}

pub struct SessionLoop {
    agent: AgentLoop,
    vocabulary: Arc<dyn VocabularySource>,
}

impl SessionLoop {
    pub fn new(agent: AgentLoop, vocabulary: Arc<dyn VocabularySource>) -> Self {
        Self { agent, vocabulary }
    }

    /// Drive the state machine from `AwaitingInput` until `Terminal`.
    /// Returns the number of completed turns.
    pub async fn run(&self, console: &mut dyn Console) -> Result<usize, AgentError> {
        let mut state = SessionState::AwaitingInput;
        let mut turns = 0;
        while state != SessionState::Terminal {
            if matches!(state, SessionState::AwaitingContinue) {
                turns += 1;
            }
            state = self.step(state, console).await?;
        }
        info!("Session ended after {} turn(s)", turns);
        Ok(turns)
    }

    /// Perform the work of `state` and return the next state.
    pub async fn step(
        &self,
        state: SessionState,
        console: &mut dyn Console,
    ) -> Result<SessionState, AgentError> {
        let next = match state {
            SessionState::AwaitingInput => match console.read_line(QUESTION_PROMPT)? {
                None => SessionState::Terminal,
                Some(line) if line.trim().is_empty() => SessionState::AwaitingInput,
                Some(line) => SessionState::FetchingVocabulary { question: line },
            },
            SessionState::FetchingVocabulary { question } => {
                let vocabulary = vocabulary::fetch_or_empty(self.vocabulary.as_ref(), &question).await;
                SessionState::Reasoning {
                    question,
                    vocabulary,
                }
            }
            SessionState::Reasoning {
                question,
                vocabulary,
            } => {
                if let Err(e) = self.reason(&question, &vocabulary, console).await {
                    warn!("Turn failed: {}", e);
                    console.write_line(&format!("Error: {}", e));
                }
                SessionState::AwaitingContinue
            }
            SessionState::AwaitingContinue => match console.read_line(CONTINUE_PROMPT)? {
                Some(answer) if wants_another(&answer) => SessionState::AwaitingInput,
                _ => SessionState::Terminal,
            },
            SessionState::Terminal => SessionState::Terminal,
        };
        Ok(next)
    }

    /// One full turn without the continue prompt: fetch the vocabulary for
    /// `question`, then reason over it.
    pub async fn ask(&self, question: &str, console: &mut dyn Console) -> Result<Message, AgentError> {
        let vocabulary = vocabulary::fetch_or_empty(self.vocabulary.as_ref(), question).await;
        self.reason(question, &vocabulary, console).await
    }

    async fn reason(
        &self,
        question: &str,
        vocabulary: &VocabularyConstraint,
        console: &mut dyn Console,
    ) -> Result<Message, AgentError> {
        let system_prompt = vocabulary.system_prompt();
        let (tx, mut rx) = mpsc::unbounded_channel::<AgentEvent>();

        let printer = async {
            while let Some(event) = rx.recv().await {
                if let Some(line) = render_event(&event) {
                    console.write_line(&line);
                }
            }
        };
        let (result, ()) = tokio::join!(self.agent.run(&system_prompt, question, tx), printer);
        result
    }
}

/// Console line for an agent event, if it has one.
pub fn render_event(event: &AgentEvent) -> Option<String> {
    match event {
        AgentEvent::ContentChunk(text) => Some(text.clone()),
        AgentEvent::ToolCallStart { name, .. } => Some(format!("  calling tool: {}", name)),
        AgentEvent::ToolResult(output) => {
            let status = if output.is_error { "error" } else { "ok" };
            let mut preview: String = output.content.chars().take(TOOL_PREVIEW_CHARS).collect();
            if preview.len() < output.content.len() {
                preview.push_str("...");
            }
            Some(format!("  [{}] {}", status, preview.replace('\n', "\n    ")))
        }
        AgentEvent::Done(message) => Some(message.content.clone()),
    }
}
