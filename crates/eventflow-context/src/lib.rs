//! Eventflow Context
//!
//! Every workflow run owns exactly one [`SharedContext`]. Steps receive a
//! clone of it alongside the event that triggered them and use it to pass
//! values that do not travel on events (for example the original query,
//! stored by one step and read by another two hops downstream).
//!
//! The context also carries:
//! - the run's cancellation token, so long-running steps can stop early
//! - a write end of the run's event stream, for streaming partial output
//!   (such as response fragments) back to the caller while the run is live
//!
//! Storage goes through the [`ContextStore`] trait. [`InMemoryStore`] is the
//! default and the only backend shipped here.

mod context;
mod error;
mod store;
mod stream;

pub use context::SharedContext;
pub use error::ContextError;
pub use store::{ContextStore, InMemoryStore};
pub use stream::EventStream;
