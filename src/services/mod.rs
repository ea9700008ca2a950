//! Business logic services
//!
//! Services hold repositories and collaborator clients behind trait objects
//! and expose the operations the API layer calls.

pub mod clock;
pub mod entitlement;
pub mod identify;
pub mod password;
pub mod sighting;
pub mod user;

pub use clock::{Clock, DynClock, SystemClock};
pub use entitlement::{EntitlementError, EntitlementService};
pub use identify::{IdentificationService, IdentifyError};
pub use password::{hash_password, verify_password};
pub use sighting::{SightingError, SightingService};
pub use user::{UserService, UserServiceError};
