//! Caller keys partitioning the limiter state.

use std::fmt;

use crate::error::KeyError;

const SEPARATOR: char = ':';

/// Identifies one bucket: an action class performed by a user of an organization.
///
/// Rendered as `{action}:{organization}:{user}`. Neither the action nor the
/// organization may contain `:`, which keeps the rendering unambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimitKey(String);

impl RateLimitKey {
    /// Create a new builder for a caller key.
    pub fn builder() -> RateLimitKeyBuilder {
        RateLimitKeyBuilder::default()
    }

    /// The rendered key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for RateLimitKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builder for caller keys.
#[derive(Debug, Default)]
pub struct RateLimitKeyBuilder {
    organization: Option<String>,
    user: Option<String>,
    action: Option<String>,
}

impl RateLimitKeyBuilder {
    /// Set the organization id.
    pub fn organization(mut self, id: impl Into<String>) -> Self {
        self.organization = Some(id.into());
        self
    }

    /// Set the user id.
    pub fn user(mut self, id: impl Into<String>) -> Self {
        self.user = Some(id.into());
        self
    }

    /// Set the action class.
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Build the key, rejecting missing, empty, or ambiguous parts.
    pub fn build(self) -> Result<RateLimitKey, KeyError> {
        let action = non_empty(self.action).ok_or(KeyError::MissingAction)?;
        let organization = non_empty(self.organization).ok_or(KeyError::MissingOrganization)?;
        let user = non_empty(self.user).ok_or(KeyError::MissingUser)?;

        if action.contains(SEPARATOR) {
            return Err(KeyError::Separator { part: "action class" });
        }

        if organization.contains(SEPARATOR) {
            return Err(KeyError::Separator { part: "organization id" });
        }

        Ok(RateLimitKey(format!("{action}{SEPARATOR}{organization}{SEPARATOR}{user}")))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}
