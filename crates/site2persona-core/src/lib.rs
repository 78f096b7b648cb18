pub mod ai;
pub mod config;
pub mod controller;
pub mod error;
pub mod loader;
pub mod playground;
pub mod result_view;
pub mod service;
pub mod session;
pub mod state;

// Re-export main types for convenience
pub use ai::{GeminiClient, GenerativeBackend};
pub use config::Config;
pub use controller::{normalize_url, Controller};
pub use error::AnalysisError;
pub use loader::AnalysisLoader;
pub use playground::{ChatPlayground, PendingSend};
pub use result_view::ResultView;
pub use service::AnalysisService;
pub use session::{ChatSession, SessionId};
pub use state::{ChatMessage, ChatRole, CompanyAnalysis, Product, WorkflowPhase};
