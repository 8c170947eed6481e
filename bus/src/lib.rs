//! xrate Event Bus
//!
//! In-process publish/subscribe with request/response correlation.
//!
//! ```text
//!  requester                 EventBus                  responder
//!     │  publish(RateRequested) │                          │
//!     │ ───────────────────────▶│  handle(event) ─────────▶│
//!     │                         │                          │ event.respond(..)
//!     │◀──────────── response channel (bounded, ≥ 1) ──────│
//!     │  wait until all expected kinds arrived or deadline │
//! ```
//!
//! Listeners are registered per [`EventKind`]. Publishing invokes every
//! listener of the event's kind and joins their errors into one
//! [`BusError::Dispatch`]; a failing listener never stops the others.
//!
//! The bus is an explicit value: construct it once and hand clones to every
//! component that publishes or subscribes.

pub mod bus;
pub mod error;
pub mod event;
pub mod listener;
pub mod request;

pub use bus::{Dispatch, EventBus};
pub use error::{BusError, BusResult};
pub use event::{Event, EventKind, Payload};
pub use listener::{listener_fn, FnListener, Listener};
pub use request::{response_channel, wait_for, Request, Responses};
