//! Core library for the `verge-ip` lookup tool.
//!
//! The crate finds the IP addresses a VergeOS virtual machine has been
//! allocated: it obtains an API token, resolves the machine by ID or name,
//! lists the machine's network interfaces, and matches their MAC addresses
//! against the address-allocation table, optionally polling until an address
//! appears.

pub mod api;
pub mod auth;
pub mod config;
pub mod credentials;
pub mod machine;
pub mod poll;
pub mod test_support;

pub use api::{ApiClient, ApiError, ReqwestTransport, Transport};
pub use auth::{AuthError, CredentialResolver};
pub use config::{ConfigError, VergeConfig};
pub use credentials::{CredentialError, CredentialSource, Credentials};
pub use machine::{MachineError, MachineId, MachineSelector};
pub use poll::{LookupError, PollOutcome, Poller, wait_budget};
