//! Utility functions shared across the crate.

use std::path::{Path, PathBuf};

/// Get the user's config directory following XDG conventions.
///
/// Returns `$XDG_CONFIG_HOME` if set, otherwise `$HOME/.config`.
pub fn config_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
}

/// Remove a file, ignoring "not found". Other failures are logged, never
/// propagated: cleanup must not mask the error that triggered it.
pub fn remove_file_quietly(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!("Removed {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
    }
}

/// First `max_chars` characters of `text`, cut on a char boundary.
pub fn char_prefix(text: &str, max_chars: usize) -> &str {
    text.char_indices()
        .nth(max_chars)
        .map_or(text, |(idx, _)| &text[..idx])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_prefix_ascii() {
        assert_eq!(char_prefix("hello world", 5), "hello");
        assert_eq!(char_prefix("short", 50), "short");
    }

    #[test]
    fn test_char_prefix_multibyte() {
        assert_eq!(char_prefix("مرحبا بالعالم", 5), "مرحبا");
        assert_eq!(char_prefix("éàü", 2), "éà");
    }

    #[test]
    fn test_remove_missing_file_is_silent() {
        remove_file_quietly(Path::new("/nonexistent/doc-translator/file.pdf"));
    }
}
