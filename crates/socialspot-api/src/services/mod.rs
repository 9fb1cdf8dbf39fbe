// Services layer for business logic
// Services own business rules and validation, calling storage and providers directly

pub mod chat;
pub mod event;
pub mod matches;
pub mod photo;
pub mod profile;
pub mod report;

pub use chat::ChatService;
pub use event::EventService;
pub use matches::MatchService;
pub use profile::ProfileService;
pub use report::ReportService;
