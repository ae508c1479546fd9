//! Notary Registry
//!
//! Binds content hashes of notarized files to owners and governs who may
//! read, transfer, license or contest each binding. File bytes never enter
//! the registry; it keeps a content hash and descriptive metadata only.
//!
//! The four stores ([`RegistrationStore`], [`OwnershipLedger`],
//! [`AccessControlList`], [`DisputeLedger`]) are only ever mutated through
//! [`RegistryService`], which authorizes every request against the caller
//! address it is given and applies it atomically.
//!
//! ```rust,ignore
//! use notary_registry::{NewRegistration, RegistryPolicy, RegistryService};
//! use notary_time::SystemClock;
//! use std::sync::Arc;
//!
//! let registry = RegistryService::new(Arc::new(SystemClock::new()), RegistryPolicy::default());
//! let id = registry.register_file(NewRegistration::new(alice, "Qm...", "Thesis", "Final draft", ""))?;
//! registry.issue_license(id, alice, bob, 3600)?;
//! assert!(registry.check_access(id, &bob));
//! ```

pub mod access;
pub mod dispute;
pub mod errors;
pub mod ownership;
pub mod policy;
pub mod registration;
pub mod service;
pub mod snapshot;
pub mod types;

pub use access::AccessControlList;
pub use dispute::DisputeLedger;
pub use errors::*;
pub use ownership::OwnershipLedger;
pub use policy::{RegistryPolicy, ResolverPolicy};
pub use registration::{NewRegistration, RegistrationStore};
pub use service::RegistryService;
pub use snapshot::{RegistrySnapshot, RegistryState, SNAPSHOT_VERSION};
pub use types::*;
