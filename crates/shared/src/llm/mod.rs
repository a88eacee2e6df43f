pub mod gateway;
pub mod groq;
pub mod prompts;

pub use gateway::{
    ChatMessage, ChatRole, LlmGateway, LlmGatewayError, LlmGatewayFuture, LlmGatewayResponse,
    LlmTokenUsage,
};
pub use groq::{GroqConfigError, GroqGateway, GroqGatewayConfig};
pub use prompts::{SYSTEM_PROMPT, assemble_prompt};
