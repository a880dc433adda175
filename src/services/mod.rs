//! Contracts between the HTTP layer and the outside world.
//!
//! [`TransitSource`], [`Store`] and [`IdentityProvider`] are what handlers
//! program against; `crate::infra` holds the implementations that talk to the
//! real providers.

pub mod denormalize;
pub mod identity;
pub mod store;
pub mod transit;

pub use identity::{AuthError, IdentityProvider, NewAccount};
pub use store::{Store, StoreError};
pub use transit::{Dataset, Query, QueryError, TransitSource, Upstream};
