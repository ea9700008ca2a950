//! Repository layer
//!
//! Trait-based repositories over the database pool. Services depend on the
//! traits, so tests can swap in-memory fakes where a real database would get
//! in the way.

pub mod scan_ledger;
pub mod session;
pub mod sighting;
pub mod user;

pub use scan_ledger::{ScanLedgerRepository, SqlxScanLedgerRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use sighting::{SightingRepository, SqlxSightingRepository};
pub use user::{SqlxUserRepository, UserRepository};
