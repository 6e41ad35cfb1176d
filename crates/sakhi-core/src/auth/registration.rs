//! Registration flow state machine.
//!
//! Mirrors the onboarding form: phone entry, code verification, then three
//! profile-collection steps (name, location, farm details). Forward moves
//! require the current step's validation to pass; `back` only ever steps to
//! the immediately preceding state. `Created` is terminal.
//!
//! The machine is pure: network outcomes (code sent, code verified, profile
//! created) are reported to it by the caller, which keeps the ordering rules
//! testable without a live auth service.

use std::fmt;

use crate::auth::{AuthError, AuthResult, Identity};
use crate::models::{FarmDetails, Language, Location, ProfileDraft};
use crate::util::is_valid_phone;

/// Steps of the registration flow, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStep {
    /// Collecting the phone number
    PhoneEntry,
    /// A verification code has been dispatched
    CodeSent,
    /// Code accepted; collecting the display name
    CodeVerified,
    /// Collecting state/district/village
    Location,
    /// Collecting land size, soil and irrigation types
    FarmDetails,
    /// Profile row exists; flow is finished
    Created,
}

impl fmt::Display for RegistrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::PhoneEntry => "phone-entry",
            Self::CodeSent => "code-sent",
            Self::CodeVerified => "code-verified",
            Self::Location => "location",
            Self::FarmDetails => "farm-details",
            Self::Created => "profile-created",
        };
        f.write_str(label)
    }
}

/// Accumulated registration state.
#[derive(Debug, Clone)]
pub struct Registration {
    step: RegistrationStep,
    language: Language,
    phone: Option<String>,
    identity: Option<Identity>,
    name: Option<String>,
    location: Option<Location>,
    farm: Option<FarmDetails>,
}

impl Registration {
    #[must_use]
    pub fn new(language: Language) -> Self {
        Self {
            step: RegistrationStep::PhoneEntry,
            language,
            phone: None,
            identity: None,
            name: None,
            location: None,
            farm: None,
        }
    }

    #[must_use]
    pub const fn step(&self) -> RegistrationStep {
        self.step
    }

    /// The verified identity, available from `CodeVerified` onwards.
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Record the phone number once a verification code has been dispatched.
    pub fn submit_phone(&mut self, phone: &str) -> AuthResult<()> {
        self.require_step(RegistrationStep::PhoneEntry, "submit phone")?;

        let phone = phone.trim();
        if !is_valid_phone(phone) {
            return Err(AuthError::Validation(
                "Phone number must be exactly 10 digits".to_string(),
            ));
        }

        self.phone = Some(phone.to_string());
        self.step = RegistrationStep::CodeSent;
        Ok(())
    }

    /// Record a successful code verification.
    pub fn submit_code(&mut self, identity: Identity) -> AuthResult<()> {
        self.require_step(RegistrationStep::CodeSent, "submit verification code")?;

        self.identity = Some(identity);
        self.step = RegistrationStep::CodeVerified;
        Ok(())
    }

    pub fn submit_name(&mut self, name: &str) -> AuthResult<()> {
        self.require_step(RegistrationStep::CodeVerified, "submit name")?;

        let name = name.trim();
        if name.is_empty() {
            return Err(AuthError::Validation("Name is required".to_string()));
        }

        self.name = Some(name.to_string());
        self.step = RegistrationStep::Location;
        Ok(())
    }

    pub fn submit_location(&mut self, location: Location) -> AuthResult<()> {
        self.require_step(RegistrationStep::Location, "submit location")?;

        if location.state.trim().is_empty()
            || location.district.trim().is_empty()
            || location.village.trim().is_empty()
        {
            return Err(AuthError::Validation(
                "State, district and village are all required".to_string(),
            ));
        }

        self.location = Some(location);
        self.step = RegistrationStep::FarmDetails;
        Ok(())
    }

    /// Accept the final collection step and produce the profile draft.
    ///
    /// The machine stays at `FarmDetails` until `complete` confirms that the
    /// profile row was actually created.
    pub fn submit_farm_details(&mut self, farm: FarmDetails) -> AuthResult<ProfileDraft> {
        self.require_step(RegistrationStep::FarmDetails, "submit farm details")?;

        if farm.land_size.trim().is_empty()
            || farm.soil_type.trim().is_empty()
            || farm.irrigation_type.trim().is_empty()
        {
            return Err(AuthError::Validation(
                "Land size, soil type and irrigation type are all required".to_string(),
            ));
        }

        self.farm = Some(farm);
        self.draft()
    }

    /// Mark the flow finished after the profile row exists remotely.
    pub fn complete(&mut self) -> AuthResult<()> {
        self.require_step(RegistrationStep::FarmDetails, "complete registration")?;
        if self.farm.is_none() {
            return Err(AuthError::InvalidTransition(
                "farm details must be submitted before completing".to_string(),
            ));
        }

        self.step = RegistrationStep::Created;
        Ok(())
    }

    /// Step back to the immediately preceding state.
    pub fn back(&mut self) -> AuthResult<()> {
        self.step = match self.step {
            RegistrationStep::PhoneEntry => {
                return Err(AuthError::InvalidTransition(
                    "already at the first step".to_string(),
                ));
            }
            RegistrationStep::CodeSent => RegistrationStep::PhoneEntry,
            RegistrationStep::CodeVerified => RegistrationStep::CodeSent,
            RegistrationStep::Location => RegistrationStep::CodeVerified,
            RegistrationStep::FarmDetails => RegistrationStep::Location,
            RegistrationStep::Created => {
                return Err(AuthError::InvalidTransition(
                    "registration is already complete".to_string(),
                ));
            }
        };
        Ok(())
    }

    fn draft(&self) -> AuthResult<ProfileDraft> {
        let incomplete = || AuthError::InvalidTransition("profile draft is incomplete".to_string());
        Ok(ProfileDraft {
            name: self.name.clone().ok_or_else(incomplete)?,
            phone: self.phone.clone().ok_or_else(incomplete)?,
            location: self.location.clone().ok_or_else(incomplete)?,
            farm: self.farm.clone().ok_or_else(incomplete)?,
            language: self.language,
        })
    }

    fn require_step(&self, expected: RegistrationStep, action: &str) -> AuthResult<()> {
        if self.step == expected {
            Ok(())
        } else {
            Err(AuthError::InvalidTransition(format!(
                "cannot {action} while at {}",
                self.step
            )))
        }
    }
}
