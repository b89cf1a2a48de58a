//! Secret name sanitisation.
//!
//! Names become a Vault path segment (`{prefix}/{name}-{id}`), so both Vault
//! managers normalise them to `^[A-Za-z_][A-Za-z0-9_]{0,63}$`.

/// Name used when the caller supplies nothing but whitespace.
pub const DEFAULT_SECRET_NAME: &str = "secret";

/// Longest name that is kept.
pub const MAX_SECRET_NAME_LEN: usize = 64;

/// Normalise a display name into a path-safe secret name.
///
/// Trims, defaults empty input to `"secret"`, replaces every character outside
/// `[A-Za-z0-9_]` with `_`, prefixes `_` when the first character is not a letter
/// or underscore, and truncates to 64 characters. Idempotent.
pub fn sanitize_secret_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return DEFAULT_SECRET_NAME.to_string();
    }

    let mut sanitized: String = trimmed
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    if !sanitized.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        sanitized.insert(0, '_');
    }

    // Only ASCII remains, so byte truncation is a character truncation.
    sanitized.truncate(MAX_SECRET_NAME_LEN);
    sanitized
}
