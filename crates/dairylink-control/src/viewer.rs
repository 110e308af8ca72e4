//! The authenticated profile, resolved into its role.

use dairylink_core::{ProfileId, Role};
use dairylink_store::Profile;
use serde::Serialize;

use crate::error::{ControlError, Result};

/// Who is making a request.
///
/// Resolved once per request from the token subject. Role-specific
/// operations take the matching variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "role", content = "profile", rename_all = "snake_case")]
pub enum Viewer {
    /// A farmer.
    Farmer(Profile),
    /// A field agent.
    Agent(Profile),
}

impl Viewer {
    /// Dispatch a profile on its role.
    #[must_use]
    pub fn from_profile(profile: Profile) -> Self {
        match profile.role {
            Role::Farmer => Self::Farmer(profile),
            Role::Agent => Self::Agent(profile),
        }
    }

    /// The underlying profile.
    #[must_use]
    pub const fn profile(&self) -> &Profile {
        match self {
            Self::Farmer(profile) | Self::Agent(profile) => profile,
        }
    }

    /// The viewer's profile ID.
    #[must_use]
    pub const fn profile_id(&self) -> ProfileId {
        self.profile().profile_id
    }

    /// The viewer's role.
    #[must_use]
    pub const fn role(&self) -> Role {
        match self {
            Self::Farmer(_) => Role::Farmer,
            Self::Agent(_) => Role::Agent,
        }
    }

    /// The profile, if the viewer is an agent.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::WrongRole` for farmers.
    pub fn require_agent(&self) -> Result<&Profile> {
        match self {
            Self::Agent(profile) => Ok(profile),
            Self::Farmer(profile) => Err(ControlError::WrongRole {
                profile_id: profile.profile_id,
                required: Role::Agent,
            }),
        }
    }

    /// The profile, if the viewer is a farmer.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::WrongRole` for agents.
    pub fn require_farmer(&self) -> Result<&Profile> {
        match self {
            Self::Farmer(profile) => Ok(profile),
            Self::Agent(profile) => Err(ControlError::WrongRole {
                profile_id: profile.profile_id,
                required: Role::Farmer,
            }),
        }
    }
}
