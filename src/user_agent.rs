//! Shared User-Agent string for all verification HTTP traffic.
//!
//! Single source for project URL and UA format so probe, CrossRef, and landing-page
//! traffic stay consistent and easy to update (good citizenship; RFC 9308).

/// Project URL for User-Agent identification (good citizenship; RFC 9308).
const PROJECT_UA_URL: &str = "https://github.com/fierce/refcheck";

/// Default User-Agent for verification requests (identifies the tool).
#[must_use]
pub(crate) fn default_probe_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("refcheck/{version} (reference-verification-tool; +{PROJECT_UA_URL})")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// The UA must carry the project URL and crate version so API operators can
    /// identify and contact us. The test uses this module's private PROJECT_UA_URL
    /// intentionally so the assertion stays in sync with the single source of truth.
    #[test]
    fn test_user_agent_identifies_tool_and_contact() {
        let ua = default_probe_user_agent();
        assert!(
            ua.contains(PROJECT_UA_URL),
            "UA must contain project URL for contact"
        );
        assert_eq!(
            env!("CARGO_PKG_VERSION"),
            ua.strip_prefix("refcheck/")
                .and_then(|s| s.split(' ').next())
                .unwrap(),
            "UA must contain crate version"
        );
    }
}
