//! Repository configuration loaded from environment variables.

/// How optional sub-graph fetches are awaited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// Initiate every fetch at once and await them jointly, provided the
    /// store reports it can serve concurrent reads.
    #[default]
    Concurrent,
    /// Await fetches one at a time, in plan order.
    Sequential,
}

impl FetchMode {
    /// Parses a mode name; unknown names yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "concurrent" | "parallel" => Some(FetchMode::Concurrent),
            "sequential" | "serial" => Some(FetchMode::Sequential),
            _ => None,
        }
    }
}

/// Repository configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `ORDERS_FETCH_MODE`: `concurrent` or `sequential` (default: `concurrent`)
#[derive(Debug, Clone, Default)]
pub struct RepositoryConfig {
    pub fetch_mode: FetchMode,
}

impl RepositoryConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            fetch_mode: std::env::var("ORDERS_FETCH_MODE")
                .ok()
                .and_then(|m| FetchMode::parse(&m))
                .unwrap_or_default(),
        }
    }

    /// Returns a configuration that never overlaps fetches.
    pub fn sequential() -> Self {
        Self {
            fetch_mode: FetchMode::Sequential,
        }
    }
}
