//! `ragchat-server` answers chat questions over HTTP, grounding each reply in
//! the documents of a knowledge base seeded at startup.
//! Replies are available whole (`POST /chat`) or as a token stream
//! (`POST /chat/stream`).

pub mod config;
pub mod error;
pub mod seeds;
pub mod server;
pub mod telemetry;

pub use config::ServerConfig;
pub use error::ApiError;
pub use server::{
    AppState, ChatRequest, ChatResponse, app_router, run, seed_knowledge, serve_until_shutdown,
};
pub use telemetry::{LogFormat, init_tracing};
