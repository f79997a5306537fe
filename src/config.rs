use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Fraction of removed vertices (relative to the total vertex count) above
/// which vertex removal switches from the set-probe path to the full
/// boolean-mask path.
pub const DEFAULT_DENSE_REMOVE_THRESHOLD: f64 = 0.1;

/// Fraction of added edges (relative to the existing edge count) above which
/// the post-add dedup/sort pass uses per-head degree arrays instead of a
/// map keyed by touched heads. Doubled internally for undirected graphs,
/// since each logical edge yields two CSR entries.
pub const DEFAULT_DENSE_REBUILD_THRESHOLD: f64 = 0.1;

/// Fraction of active vertices (relative to the inner vertex count) above
/// which `edge_map` scans every vertex with O(1) membership probes instead
/// of walking the explicit active list.
pub const DEFAULT_DENSE_TRAVERSAL_THRESHOLD: f64 = 0.1;

/// Edge count above which bulk CSR construction reports progress.
pub const BULK_BUILD_PROGRESS_THRESHOLD: usize = 1_000_000;

/// Tunable knobs of the storage and computation layers.
///
/// The three density thresholds are performance knobs, not correctness
/// constants: any value in `(0, 1]` produces identical results, only the
/// constant factors differ. They default to the 10% ratios the engine was
/// tuned with.
///
/// # Fields
///
/// * `dense_remove_threshold` - See [`DEFAULT_DENSE_REMOVE_THRESHOLD`].
/// * `dense_rebuild_threshold` - See [`DEFAULT_DENSE_REBUILD_THRESHOLD`].
/// * `dense_traversal_threshold` - See [`DEFAULT_DENSE_TRAVERSAL_THRESHOLD`].
/// * `thread_num` - Number of rayon threads for vertex/edge map operators;
///   `0` means "use the global pool as-is".
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_dense_remove")]
    pub dense_remove_threshold: f64,
    #[serde(default = "default_dense_rebuild")]
    pub dense_rebuild_threshold: f64,
    #[serde(default = "default_dense_traversal")]
    pub dense_traversal_threshold: f64,
    #[serde(default)]
    pub thread_num: usize,
}

fn default_dense_remove() -> f64 {
    DEFAULT_DENSE_REMOVE_THRESHOLD
}

fn default_dense_rebuild() -> f64 {
    DEFAULT_DENSE_REBUILD_THRESHOLD
}

fn default_dense_traversal() -> f64 {
    DEFAULT_DENSE_TRAVERSAL_THRESHOLD
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dense_remove_threshold: DEFAULT_DENSE_REMOVE_THRESHOLD,
            dense_rebuild_threshold: DEFAULT_DENSE_REBUILD_THRESHOLD,
            dense_traversal_threshold: DEFAULT_DENSE_TRAVERSAL_THRESHOLD,
            thread_num: 0,
        }
    }
}

impl EngineConfig {
    /// Loads a configuration from a YAML file.
    ///
    /// Missing fields fall back to their defaults, so a partial file such as
    /// `dense_traversal_threshold: 0.05` is valid.
    ///
    /// # Arguments
    /// * `path` - Path of the YAML configuration file.
    ///
    /// # Returns
    /// The parsed configuration, or a [`ConfigError`] describing what failed.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut raw = String::new();
        File::open(path)
            .and_then(|mut f| f.read_to_string(&mut raw))
            .map_err(ConfigError::Io)?;
        serde_yaml::from_str(&raw).map_err(ConfigError::Parse)
    }
}

/// Failure loading an [`EngineConfig`] from a file.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_yaml::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config io error: {}", e),
            ConfigError::Parse(e) => write!(f, "config parse error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}
