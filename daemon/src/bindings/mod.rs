//! Keybindings, profiles and binding resolution
//!
//! Profiles are owned by the configuration surface. The core only ever
//! reads immutable `Arc<Profile>` snapshots, so a replacement is atomic
//! from the resolver's point of view.

mod resolver;
mod store;
mod types;

pub use resolver::BindingResolver;
pub use store::{ProfileCommand, ProfileError, ProfileListing, ProfileStore};
pub use types::{Key, KeyCombo, Keybinding, Profile};

#[cfg(test)]
pub(crate) use store::DEFAULT_PROFILE;
#[cfg(test)]
pub(crate) use types::{binding, HandConstraint};
