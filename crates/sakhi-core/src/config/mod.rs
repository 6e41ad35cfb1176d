//! Remote store configuration.
//!
//! The remote Supabase backend is optional: when either the project URL or
//! the anon key is missing the app runs in local-only mode and every store
//! falls back to on-device persistence. Missing configuration is not an
//! error anywhere in this crate.

use std::env;

use serde::{Deserialize, Serialize};

use crate::util::{is_http_url, normalize_text_option};

/// Environment variable carrying the Supabase project URL.
pub const ENV_SUPABASE_URL: &str = "SAKHI_SUPABASE_URL";
/// Environment variable carrying the Supabase anon/public key.
pub const ENV_SUPABASE_ANON_KEY: &str = "SAKHI_SUPABASE_ANON_KEY";

/// Configuration for the remote Supabase backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteConfig {
    /// Supabase project URL (e.g., `https://project.supabase.co`)
    pub supabase_url: Option<String>,
    /// Supabase anon/public key
    pub anon_key: Option<String>,
}

impl RemoteConfig {
    /// Create a configuration from explicit values.
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            supabase_url: normalize_url(Some(url.into())),
            anon_key: normalize_text_option(Some(anon_key.into())),
        }
    }

    /// Resolve configuration from the environment.
    ///
    /// Absence of either variable yields an unconfigured instance rather
    /// than an error.
    pub fn from_env() -> Self {
        Self {
            supabase_url: normalize_url(env::var(ENV_SUPABASE_URL).ok()),
            anon_key: normalize_text_option(env::var(ENV_SUPABASE_ANON_KEY).ok()),
        }
    }

    /// Check whether the remote store can be reached at all.
    pub const fn is_configured(&self) -> bool {
        self.supabase_url.is_some() && self.anon_key.is_some()
    }

    /// The URL/key pair, present only when fully configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.supabase_url.as_deref(), self.anon_key.as_deref()) {
            (Some(url), Some(key)) => Some((url, key)),
            _ => None,
        }
    }
}

fn normalize_url(value: Option<String>) -> Option<String> {
    let value = normalize_text_option(value)?;
    if is_http_url(&value) {
        Some(value.trim_end_matches('/').to_string())
    } else {
        None
    }
}
