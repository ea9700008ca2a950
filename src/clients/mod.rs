//! External collaborator clients
//!
//! Each provider sits behind a trait so services can be tested against
//! fakes. The HTTP implementations carry explicit timeouts and translate
//! transport failures into the client's error enum.

pub mod audio;
pub mod billing;
pub mod classifier;
pub mod encyclopedia;

pub use audio::{AudioClient, AudioError, HttpAudioClient};
pub use billing::{BillingClient, BillingError, HttpBillingClient, SubscriptionConfirmation};
pub use classifier::{ClassifierClient, ClassifierError, HttpClassifierClient};
pub use encyclopedia::{EncyclopediaClient, EncyclopediaError, HttpEncyclopediaClient};
