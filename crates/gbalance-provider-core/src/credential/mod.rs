mod pool;
mod state;

pub use pool::{KeyPool, SelectError};
pub use state::{Credential, CredentialHealth, KeyStatus, KeyValidity};
