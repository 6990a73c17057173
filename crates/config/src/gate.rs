//! Request gate configuration.

use serde::Deserialize;

/// Which routes are gated and where the caller identity comes from.
///
/// Every action class gets a `POST {path_prefix}/{action}` route. The caller key
/// is built from the organization and user headers plus the action class.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GateConfig {
    /// Prefix of the permit routes.
    pub path_prefix: String,
    /// Header carrying the organization id, set by the authenticating proxy.
    pub organization_header: String,
    /// Header carrying the user id, set by the authenticating proxy.
    pub user_header: String,
    /// Action classes with their own budget per organization and user.
    pub actions: Vec<String>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            path_prefix: "/v1/permits".to_string(),
            organization_header: "x-organization-id".to_string(),
            user_header: "x-user-id".to_string(),
            actions: vec!["ai-outreach".to_string()],
        }
    }
}

impl GateConfig {
    /// Route path for a single action class.
    pub fn action_path(&self, action: &str) -> String {
        format!("{}/{action}", self.path_prefix.trim_end_matches('/'))
    }
}
