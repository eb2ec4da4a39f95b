// Infrastructure module - background task tracking, timers and HTTP plumbing
pub mod auth;
pub mod endpoint;
pub mod http;
pub mod task_manager;
pub mod timer;

pub use auth::{StaticToken, TokenProvider};
pub use endpoint::{parse_endpoint, with_query, with_token};
pub use http::{PollFetcher, PollRequest, PollResponse, ReqwestFetcher};
pub use task_manager::TaskManager;
pub use timer::ProbeTimer;
