//! Eventflow Event
//!
//! Events are the only thing that flows along the edges of an eventflow
//! workflow. Each event carries a kind tag and a JSON object payload.
//!
//! Two kinds are reserved:
//! - `Start` wraps the caller's run payload and seeds every run
//! - `Stop` ends a run; its payload becomes the run result
//!
//! Every other kind is user defined. Kinds with a fixed schema implement
//! [`TypedEvent`] so steps can convert between the wire form and a Rust type:
//!
//! ```
//! use eventflow_event::{Event, TypedEvent};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Greeting {
//!   name: String,
//! }
//!
//! impl TypedEvent for Greeting {
//!   const KIND: &'static str = "greeting";
//! }
//!
//! let event = Event::from_typed(&Greeting { name: "ada".into() }).unwrap();
//! assert_eq!(event.kind().as_str(), "greeting");
//! assert_eq!(event.parse::<Greeting>().unwrap().name, "ada");
//! ```

mod error;
mod event;
mod kind;

pub use error::EventError;
pub use event::{Event, Payload, TypedEvent};
pub use kind::EventKind;
