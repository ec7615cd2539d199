//! Remote environment variable tokens
//!
//! Lets users write `{{userprofile}}` on a local shell, where `%` would be
//! expanded too early, and have the device see `%userprofile%`.

/// Opening token
pub const MOUSTACHE_PREFIX: &str = "{{";

/// Closing token
pub const MOUSTACHE_SUFFIX: &str = "}}";

/// Rewrite `{{name}}` tokens to `%name%`
pub fn moustache_to_env_var(text: &str) -> String {
    text.replace(MOUSTACHE_PREFIX, "%").replace(MOUSTACHE_SUFFIX, "%")
}

/// Interpret a textual flag (`1`, `true`, `yes`, `y`; case-insensitive)
pub fn is_true_flag(text: &str) -> bool {
    matches!(text.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "y")
}
