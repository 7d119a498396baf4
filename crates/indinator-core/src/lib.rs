#![deny(warnings)]
pub mod belief;
pub mod config;
pub mod error;
pub mod game;
pub mod kb;
pub mod model;
pub mod policy;
pub mod select;

pub use config::EngineConfig;
pub use error::EngineError;
pub use game::registry::{SessionId, SessionRegistry};
pub use game::session::{Session, SessionStats};
pub use kb::KnowledgeBase;
pub use model::answer::{Answer, Confidence, Outcome};
pub use policy::{FeedbackOutcome, Guess, Phase, Turn};

pub struct AppInfo;

impl AppInfo {
    pub const fn name() -> &'static str {
        "indinator"
    }

    pub const fn codename() -> &'static str {
        "Twenty Questions"
    }

    pub const fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}
