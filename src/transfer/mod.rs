//! Transfer records and the orchestrator that drives them.

mod orchestrator;
mod record;
mod request;
mod state;
mod types;

pub use orchestrator::{StepOutcome, TransferOrchestrator};
pub use record::{TransferFailure, TransferRecord, Transition};
pub use request::TransferRequest;
pub use state::TransferState;
pub use types::{Timestamp, TransferId, TransferIdentifier};
