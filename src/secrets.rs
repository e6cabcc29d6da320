//! Shared-password lookup.
//!
//! Passwords live in a TOML document under a `[restaurants]` table keyed by
//! the restaurant name lowercased with spaces turned into underscores:
//!
//! ```toml
//! [restaurants]
//! main_street_diner = "s3cret"
//! ```
//!
//! A restaurant without an entry has an empty expected password, and an empty
//! expected password never authenticates.

use std::{collections::HashMap, fs, path::Path};

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Incorrect password. Access denied!")]
    Rejected,
    #[error("No password is configured for '{0}'; access denied")]
    NotConfigured(String),
}

pub fn secret_key(restaurant: &str) -> String {
    restaurant.to_lowercase().replace(' ', "_")
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialStore {
    #[serde(default)]
    restaurants: HashMap<String, String>,
}

impl CredentialStore {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Opening secrets file {path:?}"))?;
        Self::parse(&raw).with_context(|| format!("Parsing secrets file {path:?}"))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            restaurants: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn expected_password(&self, restaurant: &str) -> &str {
        self.restaurants
            .get(&secret_key(restaurant))
            .map(|p| p.as_str())
            .unwrap_or("")
    }

    pub fn verify(&self, restaurant: &str, attempt: &str) -> Result<(), AuthError> {
        let expected = self.expected_password(restaurant);
        if expected.is_empty() {
            return Err(AuthError::NotConfigured(restaurant.to_string()));
        }
        if attempt == expected {
            Ok(())
        } else {
            Err(AuthError::Rejected)
        }
    }
}
