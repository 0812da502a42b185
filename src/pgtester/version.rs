//! Version information reported by `pgtester -v`.

/// Semantic version of this application, as printed by the version flag.
pub const APP_VERSION: &str = concat!("v", env!("CARGO_PKG_VERSION"));

/// Returns the version of this application.
pub fn app_version() -> &'static str {
    APP_VERSION
}
