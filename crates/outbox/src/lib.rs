mod candidates;
mod config;
pub mod debouncer;
mod error;
mod fallback;
mod filtermap;
mod health;
mod persist;
mod pipeline;
mod select;
pub mod storage;
mod time;

pub use candidates::{
    resolve_users, CandidateIndex, Mailboxes, MailboxSource, RelayCandidate, RelayRole, UserRelays,
    OBSERVED_WEIGHT,
};
pub use config::{OutboxConfig, DEFAULT_MAX_CONNECTIONS, DEFAULT_MAX_RELAYS_PER_USER};
pub use debouncer::Debouncer;
pub use error::Error;
pub use fallback::inject_fallbacks;
pub use filtermap::FilterMapBuilder;
pub use health::{RelayHealth, RelayHealthState, RelayHealthTracker};
pub use persist::HealthHandler;
pub use pipeline::{OutboxRouter, RelayPlan};
pub use select::{select_relays, SelectionResult, UserAssignment};
pub use storage::{DataPath, Directory};
pub use time::unix_time_secs;

pub type Result<T> = std::result::Result<T, Error>;

// export libs
pub use enrelay;
pub use nostr;
