mod agent;
mod conversation;
mod events;
mod io;
mod parser;
mod prompts;

pub use agent::{is_exit_token, Agent, AgentState, EXIT_TOKENS};
pub use conversation::ConversationState;
pub use events::AgentEvent;
pub use io::{format_event, ScriptedTerminal, Terminal};
pub use parser::{ParseError, ToolCallParser};
pub use prompts::{system_prompt, PROMPT_VERSION};
