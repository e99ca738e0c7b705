//! Provenance tracing for the Krishi supply chain.
//!
//! Builds on the record and document stores in `krishi-storage`:
//!
//! - [`resolve_trail`] walks a record's upstream links back to its harvest.
//! - [`Ledger`] records stages on behalf of signed-in actors, enforcing
//!   which role may author which stage.
//! - [`AuthProvider`] authenticates accounts and tracks sign-in state.
//! - [`seed_demo`] loads the demonstration dataset.

pub mod auth;
pub mod demo;
mod error;
mod intake;
mod ledger;
mod resolver;

pub use auth::{
    current_profile, AuthProvider, Identity, LocalAuthProvider, Session, SignupProfile,
};
pub use demo::{seed_demo, DemoDataset, DEMO_PASSWORD};
pub use error::TraceError;
pub use intake::LookupInput;
pub use ledger::{HarvestInput, Ledger, PurchaseInput, SaleInput};
pub use resolver::{
    resolve_trail, resolve_trail_with_holders, ProvenanceTrail, TrailStep, MAX_TRAIL_DEPTH,
};
