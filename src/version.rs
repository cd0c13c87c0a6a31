//! Build identification

use crate::build;

/// Tag identifying this build.
///
/// Resolved at compile time from the `BUILD_TAG` environment variable,
/// then the git tag, then the short commit hash, then the package version.
pub fn build_tag() -> &'static str {
    match option_env!("BUILD_TAG") {
        Some(tag) if !tag.is_empty() => tag,
        _ => first_non_empty(&[build::TAG, build::SHORT_COMMIT], build::PKG_VERSION),
    }
}

fn first_non_empty(candidates: &[&'static str], fallback: &'static str) -> &'static str {
    candidates
        .iter()
        .copied()
        .find(|c| !c.is_empty())
        .unwrap_or(fallback)
}
