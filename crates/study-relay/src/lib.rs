// study-relay/crates/study-relay/src/lib.rs

pub mod api;
pub mod backend_target;
pub mod config;
pub mod error;
pub mod llm;
pub mod metrics;
pub mod schedule;
pub mod server;
pub mod shared_state;
pub mod telemetry;
pub mod utils;

// Public API exports
pub use config::Config;
pub use error::{EndpointFailure, FailureReason, LlmError};
pub use server::{build_router, run_server};
pub use shared_state::AppState;

pub use llm::{ChatMessage, ConversationFramer, EndpointProber, LlmClient, RelayEvent, Role};
pub use schedule::{extract_schedule, format_for_calendar, CalendarEvent, StudySchedule, SubjectPlan, TimeOfDay};

// API exports
pub use api::{
    admin_api::status,
    chat_api::{chat, ChatResponse},
    schedule_api::{extract, preview},
    stream_api::{generate_stream, StreamChatRequest},
};
