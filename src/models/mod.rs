//! Data models
//!
//! Data structures used throughout the BirdScope backend:
//! - Database entities (User, Session, ScanLedgerEntry, Sighting)
//! - Entitlement types (Feature, EntitlementDecision)
//! - Collaborator shapes (Identification, SpeciesProfile, Recording)

mod entitlement;
mod session;
mod sighting;
mod species;
mod user;

pub use entitlement::{
    unlocked_features, DenyReason, EntitlementDecision, Feature, ScanLedgerEntry,
    FREE_DAILY_SCAN_LIMIT, UNLIMITED_SCANS,
};
pub use session::{AccountSession, Session};
pub use sighting::{CreateSightingInput, Sighting};
pub use species::{BirdResult, Identification, NearbyObservation, Recording, SpeciesProfile};
pub use user::{SubscriptionTier, User};
