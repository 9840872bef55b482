pub mod analysis;
pub mod comment;
pub mod config;
pub mod helpdesk;
pub mod matcher;
pub mod metrics;
pub mod reconciler;
pub mod retry;
pub mod testing;
pub mod updater;

pub use analysis::{AnalysisError, AnalysisRecord, AnalysisSource, FsAnalysisSource};
pub use comment::{render_comment, TicketComment};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
    TranscriptDestination,
};
pub use helpdesk::{HelpdeskApi, HelpdeskConnector, HelpdeskError, HttpConnector, HttpHelpdesk};
pub use matcher::{MatchedTicket, TicketMatcher};
pub use reconciler::{
    AnalysisOutcome, EventError, EventOutcome, ReconcileError, Reconciler, SweepReport,
    TriggerEvent,
};
pub use retry::{PendingMatch, RetryScan, RetryStore, RetryStoreError, SqliteRetryStore};
pub use updater::{TicketUpdater, TranscriptPlacement, UpdateReport};
