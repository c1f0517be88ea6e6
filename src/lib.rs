pub mod api;
pub mod chat;
pub mod constants;
pub mod error;
pub mod knowledge_base;
pub mod responder;
pub mod web_server;

pub use chat::{ChatBackend, ChatClient, ChatSession, ChatView, SendOutcome, Sender, TerminalView};
pub use error::{ApiError, ClientError, KnowledgeBaseError};
pub use knowledge_base::{Entry, KnowledgeBase};
pub use web_server::{build_router, start_web_server, AppState, ServerConfig};
