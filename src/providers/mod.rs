//! Production implementations of the trait seams in [`crate::traits`].
//!
//! Stores live in [`crate::store`]; fakes for tests live in
//! [`crate::testing`].

mod alloy;
mod iris;
mod tokio_clock;

pub use self::alloy::AlloyChainClient;
pub use self::iris::IrisAttestationProvider;
pub use self::tokio_clock::TokioClock;
