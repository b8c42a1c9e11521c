//! Version and git revision baked in by `build.rs`.

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Short git hash, or `unknown` outside a checkout.
pub const BUILD_HASH: &str = env!("BUILD_HASH");

const BUILD_DIRTY: &str = env!("BUILD_DIRTY");

fn revision() -> String {
    if BUILD_DIRTY == "true" {
        format!("{BUILD_HASH}*")
    } else {
        BUILD_HASH.to_string()
    }
}

/// `0.1.0 (abc1234)`, with `*` after the hash for dirty trees.
///
/// Reported by `/health`.
#[must_use]
pub fn version_string() -> String {
    format!("{VERSION} ({})", revision())
}

/// `build abc1234`, for log lines.
#[must_use]
pub fn short_version() -> String {
    format!("build {}", revision())
}

/// `User-Agent` for outgoing HTTP requests.
#[must_use]
pub fn user_agent() -> String {
    format!("agent-chat/{VERSION}")
}
