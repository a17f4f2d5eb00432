//! User-Agent string sent with page and file requests.

/// Default User-Agent identifying the tool and its version.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("pagegrab/{version}")
}
