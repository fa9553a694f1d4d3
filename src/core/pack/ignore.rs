// ─── Ignore Patterns ───
// `install.ignore_files` entries are glob patterns. Entries starting with
// `mods/` only filter component downloads (matched against the file name);
// every other entry only filters the override tree (matched against the
// path relative to the install root).

use glob::{MatchOptions, Pattern};
use tracing::warn;

use crate::core::error::{StarterError, StarterResult};

/// Directory (relative to the install root) component downloads land in.
pub const COMPONENTS_DIR: &str = "mods";

const COMPONENT_PREFIX: &str = "mods/";

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

#[derive(Debug, Clone, Default)]
pub struct IgnorePatterns {
    overrides: Vec<Pattern>,
    components: Vec<Pattern>,
}

impl IgnorePatterns {
    pub fn parse<S: AsRef<str>>(raw: &[S]) -> StarterResult<Self> {
        let mut patterns = Self::default();

        for entry in raw {
            let entry = entry.as_ref().trim();
            if entry.is_empty() {
                continue;
            }

            if let Some(file_pattern) = entry.strip_prefix(COMPONENT_PREFIX) {
                patterns.components.push(compile(entry, file_pattern)?);
            } else {
                patterns.overrides.push(compile(entry, entry)?);
            }
        }

        if patterns.components.iter().any(|p| p.as_str().contains('/')) {
            warn!("Component ignore patterns only match file names, nested paths never match");
        }

        Ok(patterns)
    }

    /// `relative_path` is relative to the install root, `/`-separated.
    pub fn ignores_override(&self, relative_path: &str) -> bool {
        self.overrides
            .iter()
            .any(|p| p.matches_with(relative_path, MATCH_OPTIONS))
    }

    /// `file_name` is the component's file name inside `mods/`.
    pub fn ignores_component(&self, file_name: &str) -> bool {
        self.components
            .iter()
            .any(|p| p.matches_with(file_name, MATCH_OPTIONS))
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty() && self.components.is_empty()
    }
}

fn compile(entry: &str, pattern: &str) -> StarterResult<Pattern> {
    Pattern::new(pattern)
        .map_err(|e| StarterError::Config(format!("invalid ignore pattern {entry:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_patterns_match_file_names() {
        let patterns = IgnorePatterns::parse(&["mods/optifine*.jar"]).unwrap();
        assert!(patterns.ignores_component("optifine-1.16.5.jar"));
        assert!(!patterns.ignores_component("jei-7.0.jar"));
    }

    #[test]
    fn component_patterns_never_hide_override_files() {
        let patterns = IgnorePatterns::parse(&["mods/*.jar"]).unwrap();
        assert!(!patterns.ignores_override("mods/local.jar"));
        assert!(!patterns.ignores_override("local.jar"));
    }

    #[test]
    fn override_patterns_never_hide_components() {
        let patterns = IgnorePatterns::parse(&["*.jar", "config/**"]).unwrap();
        assert!(patterns.ignores_override("server.jar"));
        assert!(patterns.ignores_override("config/jei/settings.toml"));
        assert!(!patterns.ignores_component("jei-7.0.jar"));
    }

    #[test]
    fn blank_entries_are_ignored() {
        let patterns = IgnorePatterns::parse(&["", "   "]).unwrap();
        assert!(patterns.is_empty());
    }

    #[test]
    fn invalid_pattern_is_a_config_error() {
        let err = IgnorePatterns::parse(&["config/[abc"]).unwrap_err();
        assert!(matches!(err, StarterError::Config(_)));
    }
}
