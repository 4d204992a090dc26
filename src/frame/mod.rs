//! The two browsing contexts: the top-level router and the embedded frame
//! that hosts the engine, plus the message protocol between them.

pub mod embedded;
pub mod events;
pub mod liveness;
pub mod location;
pub mod message;
pub mod router;

pub use embedded::{DetachedGuest, EmbeddedContext, EmbeddedDocument, Guest};
pub use events::{EventTarget, ListenerId};
pub use liveness::{LivenessProbe, ProbeId, DEFAULT_PROBE_TIMEOUT};
pub use location::Location;
pub use message::{FrameCommand, FrameMessage, ParentMessage, ParentPort};
pub use router::{
    FrameHandle, NavigationError, NavigationOutcome, NavigationRouter, TopWindow, DEFAULT_ROUTE,
    NOT_FOUND_TAG,
};
