//! Profile storage and configuration edits
//!
//! Every edit produces a fresh snapshot of the active profile when it is
//! affected; callers install that snapshot in one step.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{Keybinding, Profile};

/// Name of the profile created at startup
pub const DEFAULT_PROFILE: &str = "default";

/// Errors from configuration edits
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProfileError {
    #[error("unknown profile: {0}")]
    UnknownProfile(String),

    #[error("unknown binding {id} in profile {profile}")]
    UnknownBinding { profile: String, id: String },

    #[error("cannot delete the active profile: {0}")]
    ActiveProfile(String),

    #[error("profile name must not be empty")]
    EmptyName,
}

impl ProfileError {
    /// Stable machine-readable code for IPC error responses
    pub fn code(&self) -> &'static str {
        match self {
            ProfileError::UnknownProfile(_) => "unknown_profile",
            ProfileError::UnknownBinding { .. } => "unknown_binding",
            ProfileError::ActiveProfile(_) => "active_profile",
            ProfileError::EmptyName => "empty_name",
        }
    }
}

/// Configuration edits pushed by the configuration surface
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileCommand {
    UpsertProfile(Profile),
    DeleteProfile(String),
    SetActiveProfile(String),
    UpsertBinding { profile: String, binding: Keybinding },
    DeleteBinding { profile: String, id: String },
    ToggleBinding { profile: String, id: String, enabled: Option<bool> },
}

/// Summary of stored profiles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileListing {
    pub active: String,
    pub profiles: Vec<Profile>,
}

#[derive(Debug)]
pub struct ProfileStore {
    profiles: Vec<Profile>,
    active: String,
    snapshot: Arc<Profile>,
}

impl Default for ProfileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileStore {
    /// Create a store holding one empty, active default profile
    pub fn new() -> Self {
        let profile = Profile::new(DEFAULT_PROFILE);
        Self {
            snapshot: Arc::new(profile.clone()),
            profiles: vec![profile],
            active: DEFAULT_PROFILE.to_string(),
        }
    }

    /// Snapshot of the active profile
    pub fn active(&self) -> Arc<Profile> {
        Arc::clone(&self.snapshot)
    }

    pub fn active_name(&self) -> &str {
        &self.active
    }

    pub fn listing(&self) -> ProfileListing {
        ProfileListing {
            active: self.active.clone(),
            profiles: self.profiles.clone(),
        }
    }

    /// Apply an edit; returns the new active snapshot if the active profile changed
    pub fn apply(&mut self, command: ProfileCommand) -> Result<Option<Arc<Profile>>, ProfileError> {
        let touched = match command {
            ProfileCommand::UpsertProfile(profile) => self.upsert_profile(profile)?,
            ProfileCommand::DeleteProfile(name) => self.delete_profile(&name)?,
            ProfileCommand::SetActiveProfile(name) => self.set_active(&name)?,
            ProfileCommand::UpsertBinding { profile, binding } => {
                self.upsert_binding(&profile, binding)?
            }
            ProfileCommand::DeleteBinding { profile, id } => self.delete_binding(&profile, &id)?,
            ProfileCommand::ToggleBinding { profile, id, enabled } => {
                self.toggle_binding(&profile, &id, enabled)?
            }
        };

        if !touched {
            return Ok(None);
        }

        self.snapshot = Arc::new(self.profile(&self.active)?.clone());
        Ok(Some(self.active()))
    }

    fn profile(&self, name: &str) -> Result<&Profile, ProfileError> {
        self.profiles
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ProfileError::UnknownProfile(name.to_string()))
    }

    fn profile_mut(&mut self, name: &str) -> Result<&mut Profile, ProfileError> {
        self.profiles
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| ProfileError::UnknownProfile(name.to_string()))
    }

    fn upsert_profile(&mut self, profile: Profile) -> Result<bool, ProfileError> {
        if profile.name.trim().is_empty() {
            return Err(ProfileError::EmptyName);
        }

        let touched = profile.name == self.active;
        info!(profile = %profile.name, bindings = profile.bindings.len(), "profile stored");

        match self.profiles.iter_mut().find(|p| p.name == profile.name) {
            Some(existing) => *existing = profile,
            None => self.profiles.push(profile),
        }
        Ok(touched)
    }

    fn delete_profile(&mut self, name: &str) -> Result<bool, ProfileError> {
        if name == self.active {
            return Err(ProfileError::ActiveProfile(name.to_string()));
        }
        let before = self.profiles.len();
        self.profiles.retain(|p| p.name != name);
        if self.profiles.len() == before {
            return Err(ProfileError::UnknownProfile(name.to_string()));
        }
        info!(profile = %name, "profile deleted");
        Ok(false)
    }

    fn set_active(&mut self, name: &str) -> Result<bool, ProfileError> {
        self.profile(name)?;
        info!(from = %self.active, to = %name, "active profile switched");
        self.active = name.to_string();
        Ok(true)
    }

    fn upsert_binding(&mut self, profile: &str, binding: Keybinding) -> Result<bool, ProfileError> {
        let target = self.profile_mut(profile)?;
        match target.bindings.iter_mut().find(|b| b.id == binding.id) {
            Some(existing) => *existing = binding,
            None => target.bindings.push(binding),
        }
        Ok(profile == self.active)
    }

    fn delete_binding(&mut self, profile: &str, id: &str) -> Result<bool, ProfileError> {
        let target = self.profile_mut(profile)?;
        let before = target.bindings.len();
        target.bindings.retain(|b| b.id != id);
        if target.bindings.len() == before {
            return Err(ProfileError::UnknownBinding {
                profile: profile.to_string(),
                id: id.to_string(),
            });
        }
        Ok(profile == self.active)
    }

    fn toggle_binding(
        &mut self,
        profile: &str,
        id: &str,
        enabled: Option<bool>,
    ) -> Result<bool, ProfileError> {
        let target = self.profile_mut(profile)?;
        let binding = target
            .bindings
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| ProfileError::UnknownBinding {
                profile: profile.to_string(),
                id: id.to_string(),
            })?;
        binding.enabled = enabled.unwrap_or(!binding.enabled);
        Ok(profile == self.active)
    }
}
