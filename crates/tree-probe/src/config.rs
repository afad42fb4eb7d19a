//! Render session configuration.

use std::fmt;
use std::rc::Rc;

use crate::debug::{ConsoleSink, DebugSink, Palette};

/// Prop key read by the test-id matcher unless configured otherwise
pub const DEFAULT_TEST_ID_KEY: &str = "testID";

/// Flush passes allowed before an update loop is reported
pub const DEFAULT_FLUSH_LIMIT: usize = 100;

/// Selects the debug colour mode
pub const COLOR_ENV_VAR: &str = "TREE_PROBE_COLOR";

/// Overrides the flush pass limit
pub const FLUSH_LIMIT_ENV_VAR: &str = "TREE_PROBE_FLUSH_LIMIT";

/// Whether debug output is styled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    /// Follow the terminal
    #[default]
    Auto,
    /// Always style
    Always,
    /// Never style
    Never,
}

impl ColorMode {
    /// Resolve to a concrete on/off
    #[must_use]
    pub fn enabled(self) -> bool {
        match self {
            Self::Auto => console::colors_enabled(),
            Self::Always => true,
            Self::Never => false,
        }
    }

    /// Parse `auto`, `always` or `never`, case-insensitively
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "always" => Some(Self::Always),
            "never" => Some(Self::Never),
            _ => None,
        }
    }
}

/// Configuration for a render session
#[derive(Clone)]
pub struct RenderConfig {
    /// Prop key holding test ids
    pub test_id_key: String,
    /// Debug colour mode
    pub color: ColorMode,
    /// Maximum flush passes per commit
    pub flush_limit: usize,
    sink: Rc<dyn DebugSink>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            test_id_key: DEFAULT_TEST_ID_KEY.to_string(),
            color: ColorMode::Auto,
            flush_limit: DEFAULT_FLUSH_LIMIT,
            sink: Rc::new(ConsoleSink),
        }
    }
}

impl fmt::Debug for RenderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderConfig")
            .field("test_id_key", &self.test_id_key)
            .field("color", &self.color)
            .field("flush_limit", &self.flush_limit)
            .finish_non_exhaustive()
    }
}

impl RenderConfig {
    /// Defaults with environment overrides applied
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().apply_env(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a variable lookup
    ///
    /// Unparseable values are logged and ignored.
    #[must_use]
    pub fn apply_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(COLOR_ENV_VAR) {
            match ColorMode::parse(&raw) {
                Some(mode) => self.color = mode,
                None => tracing::warn!(value = %raw, "ignoring unknown {COLOR_ENV_VAR}"),
            }
        }
        if let Some(raw) = lookup(FLUSH_LIMIT_ENV_VAR) {
            match raw.trim().parse::<usize>() {
                Ok(limit) if limit > 0 => self.flush_limit = limit,
                _ => tracing::warn!(value = %raw, "ignoring invalid {FLUSH_LIMIT_ENV_VAR}"),
            }
        }
        self
    }

    /// Set the test-id prop key
    #[must_use]
    pub fn with_test_id_key(mut self, key: impl Into<String>) -> Self {
        self.test_id_key = key.into();
        self
    }

    /// Set the colour mode
    #[must_use]
    pub const fn with_color(mut self, color: ColorMode) -> Self {
        self.color = color;
        self
    }

    /// Set the flush pass limit
    #[must_use]
    pub const fn with_flush_limit(mut self, limit: usize) -> Self {
        self.flush_limit = limit;
        self
    }

    /// Send debug output to `sink`
    #[must_use]
    pub fn with_sink(mut self, sink: impl DebugSink + 'static) -> Self {
        self.sink = Rc::new(sink);
        self
    }

    /// Debug output destination
    #[must_use]
    pub fn sink(&self) -> &dyn DebugSink {
        self.sink.as_ref()
    }

    /// Palette for the configured colour mode
    #[must_use]
    pub fn palette(&self) -> Palette {
        Palette::new(self.color.enabled())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::debug::CaptureSink;

    #[test]
    fn test_defaults() {
        let config = RenderConfig::default();
        assert_eq!(config.test_id_key, "testID");
        assert_eq!(config.color, ColorMode::Auto);
        assert_eq!(config.flush_limit, 100);
    }

    #[test]
    fn test_builders() {
        let config = RenderConfig::default()
            .with_test_id_key("data-testid")
            .with_color(ColorMode::Never)
            .with_flush_limit(7);
        assert_eq!(config.test_id_key, "data-testid");
        assert!(!config.color.enabled());
        assert_eq!(config.flush_limit, 7);
    }

    #[test]
    fn test_color_mode_parse() {
        assert_eq!(ColorMode::parse("ALWAYS"), Some(ColorMode::Always));
        assert_eq!(ColorMode::parse(" never "), Some(ColorMode::Never));
        assert_eq!(ColorMode::parse("auto"), Some(ColorMode::Auto));
        assert_eq!(ColorMode::parse("sometimes"), None);
    }

    #[test]
    fn test_apply_env_overrides() {
        let config = RenderConfig::default().apply_env(|key| match key {
            COLOR_ENV_VAR => Some("always".to_string()),
            FLUSH_LIMIT_ENV_VAR => Some("12".to_string()),
            _ => None,
        });
        assert_eq!(config.color, ColorMode::Always);
        assert_eq!(config.flush_limit, 12);
    }

    #[test]
    fn test_apply_env_ignores_garbage() {
        let config = RenderConfig::default().apply_env(|key| match key {
            COLOR_ENV_VAR => Some("purple".to_string()),
            FLUSH_LIMIT_ENV_VAR => Some("0".to_string()),
            _ => None,
        });
        assert_eq!(config.color, ColorMode::Auto);
        assert_eq!(config.flush_limit, DEFAULT_FLUSH_LIMIT);
    }

    #[test]
    fn test_sink_is_used() {
        let capture = CaptureSink::new();
        let config = RenderConfig::default().with_sink(capture.clone());
        config.sink().write("<View />", None);
        assert_eq!(capture.len(), 1);
    }
}
