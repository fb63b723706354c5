//! Application services for Atelier.
//!
//! Wires the core domain to the transport layer: the chat session send
//! pipeline plus the external gallery and identity collaborators.

pub mod gallery;
pub mod identity;
pub mod session;

pub use gallery::{GalleryPayload, GalleryStore, NoopGalleryStore};
pub use identity::{AuthSession, IdentityProvider, LocalIdentityProvider, UserProfile};
pub use session::{ChatSession, SendOutcome, SessionEvent};
