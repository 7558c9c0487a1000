use anyhow::{anyhow, Result};
use config::Config;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

use crate::database::DistanceMetric;

pub const DEFAULT_DATABASE_FILE: &str = "opacities.db";
pub const DEFAULT_DOCUMENT_FILE: &str = "opacities.json";

pub struct OpacidbConfig {
    /// Path to the directory holding the opacity files
    pub data_dir: String,

    /// File name of the relational database inside `data_dir`
    pub database_file: String,

    /// File name of the hierarchical document inside `data_dir`
    pub document_file: String,

    /// Metric used to resolve (pressure, temperature) requests
    pub distance_metric: DistanceMetric,
}

const EMPTY_CONFIG: &str = r#"### opacidb configuration file

### directory holding the opacity reference files
# data_dir = "~/.opacidb"

### file names inside data_dir
# database_file = "opacities.db"
# document_file = "opacities.json"

### nearest grid point metric: "raw" or "normalized"
# distance_metric = "raw"
"#;

impl Default for OpacidbConfig {
    fn default() -> Self {
        let home_dir = dirs::home_dir()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|| ".".to_string());

        Self {
            data_dir: format!("{}/.opacidb", home_dir),
            database_file: DEFAULT_DATABASE_FILE.to_string(),
            document_file: DEFAULT_DOCUMENT_FILE.to_string(),
            distance_metric: DistanceMetric::Raw,
        }
    }
}

impl OpacidbConfig {
    /// Function to create and initialize a new configuration
    pub fn new(path: &Option<String>) -> Result<OpacidbConfig> {
        let mut builder = Config::builder();

        // By default use $HOME/.opacidb/opacidb.toml as the configuration file path
        let home_dir = dirs::home_dir()
            .ok_or_else(|| anyhow!("Could not find home directory"))?
            .to_str()
            .ok_or_else(|| anyhow!("Could not convert home directory path to string"))?
            .to_owned();

        let opacidb_dir = format!("{}/.opacidb", home_dir.as_str());

        match path {
            Some(p) => {
                let path = Path::new(p.as_str());
                if path.exists() {
                    let path_str = path
                        .to_str()
                        .ok_or_else(|| anyhow!("Could not convert path to string"))?;
                    builder = builder.add_source(config::File::with_name(path_str));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG)
                        .map_err(|e| anyhow!("Unable to create config file: {}", e))?;
                }
            }
            None => {
                std::fs::create_dir_all(opacidb_dir.as_str())
                    .map_err(|e| anyhow!("Unable to create opacidb directory: {}", e))?;
                let p = format!("{}/opacidb.toml", opacidb_dir.as_str());
                if Path::new(p.as_str()).exists() {
                    builder = builder.add_source(config::File::with_name(p.as_str()));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG).map_err(|e| {
                        anyhow!("Unable to create config file {}: {}", p.as_str(), e)
                    })?;
                }
            }
        }

        // E.g., `OPACIDB_DATA_DIR=/data/opacities opacidb info` overrides the data directory
        builder = builder.add_source(config::Environment::with_prefix("OPACIDB"));

        let settings = builder
            .build()
            .map_err(|e| anyhow!("Failed to build configuration: {}", e))?;

        let config = settings
            .try_deserialize::<HashMap<String, String>>()
            .map_err(|e| anyhow!("Failed to deserialize configuration: {}", e))?;

        let data_dir = match config.get("data_dir") {
            Some(p) => expand_home(p, &home_dir),
            None => opacidb_dir,
        };

        let database_file = config
            .get("database_file")
            .cloned()
            .unwrap_or_else(|| DEFAULT_DATABASE_FILE.to_string());

        let document_file = config
            .get("document_file")
            .cloned()
            .unwrap_or_else(|| DEFAULT_DOCUMENT_FILE.to_string());

        let distance_metric = match config.get("distance_metric") {
            Some(m) => m.parse::<DistanceMetric>().map_err(|e| anyhow!(e))?,
            None => DistanceMetric::Raw,
        };

        Ok(OpacidbConfig {
            data_dir,
            database_file,
            document_file,
            distance_metric,
        })
    }

    /// Get the path to the SQLite database file
    pub fn sqlite_path(&self) -> String {
        let data_dir = self.data_dir.trim_end_matches('/');
        format!("{}/{}", data_dir, self.database_file)
    }

    /// Get the path to the hierarchical JSON document
    pub fn document_path(&self) -> String {
        let data_dir = self.data_dir.trim_end_matches('/');
        format!("{}/{}", data_dir, self.document_file)
    }

    /// Create the data directory if it does not exist yet
    pub fn ensure_data_dir(&self) -> Result<()> {
        crate::database::ensure_data_dir(&self.data_dir)
    }

    /// Display configuration summary
    pub fn summary(&self) -> String {
        [
            format!("Data Directory:     {}", self.data_dir),
            format!("SQLite Path:        {}", self.sqlite_path()),
            format!("Document Path:      {}", self.document_path()),
            format!("Distance Metric:    {}", self.distance_metric),
        ]
        .join("\n")
    }

    /// Get the config file path
    pub fn config_file_path() -> String {
        let home_dir = dirs::home_dir()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|| "~".to_string());
        format!("{}/.opacidb/opacidb.toml", home_dir)
    }
}

fn expand_home(path: &str, home_dir: &str) -> String {
    match path.strip_prefix("~/") {
        Some(rest) => format!("{}/{}", home_dir, rest),
        None if path == "~" => home_dir.to_string(),
        None => path.to_string(),
    }
}

// =============================================================================
// Opacity file info (used by the config and info commands)
// =============================================================================

/// Information about the relational opacity database
#[derive(Debug, Serialize, Clone)]
pub struct SqliteDatabaseInfo {
    pub path: String,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid_len: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuum_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub molecular_count: Option<u64>,
}

/// Information about the hierarchical opacity document
#[derive(Debug, Serialize, Clone)]
pub struct DocumentInfo {
    pub path: String,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid_len: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuum_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub molecular_count: Option<usize>,
}

fn file_size(path: &str) -> Option<u64> {
    std::fs::metadata(path).ok().map(|m| m.len())
}

/// Get SQLite database information
///
/// The file is opened read-only; an unreadable file leaves the optional
/// fields empty.
pub fn get_sqlite_info(config: &OpacidbConfig) -> SqliteDatabaseInfo {
    use crate::database::{OpacityDatabase, SchemaManager};

    let path = config.sqlite_path();
    let mut info = SqliteDatabaseInfo {
        exists: Path::new(&path).exists(),
        size_bytes: file_size(&path),
        path,
        schema_status: None,
        schema_version: None,
        grid_len: None,
        continuum_count: None,
        molecular_count: None,
    };
    if !info.exists {
        return info;
    }

    if let Ok(conn) = crate::database::DatabaseConn::open_read_only(&info.path) {
        let manager = SchemaManager::new(&conn.conn);
        info.schema_status = manager.check_status().ok().map(|s| s.to_string());
        info.schema_version = manager.get_schema_version().ok();
    }

    if let Ok(db) = OpacityDatabase::open_read_only(&info.path) {
        info.grid_len = db.headers().wavenumber_grid().ok().flatten().map(|g| g.len());
        info.continuum_count = db.continuum().count().ok();
        info.molecular_count = db.molecular().count().ok();
    }

    info
}

/// Get hierarchical document information
pub fn get_document_info(config: &OpacidbConfig) -> DocumentInfo {
    use crate::database::OpacityDocument;

    let path = config.document_path();
    let mut info = DocumentInfo {
        exists: Path::new(&path).exists(),
        size_bytes: file_size(&path),
        path,
        created_at: None,
        grid_len: None,
        continuum_count: None,
        molecular_count: None,
    };

    if info.exists {
        if let Ok(doc) = OpacityDocument::load(&info.path) {
            info.created_at = doc
                .attrs
                .created_at
                .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string());
            info.grid_len = Some(doc.attrs.wavenumber_grid.len());
            info.continuum_count = Some(doc.continuum_count());
            info.molecular_count = Some(doc.molecular_count());
        }
    }

    info
}

/// Format bytes as human-readable size
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{OpacityDatabase, OpacityHeader, OpacityUnits};

    fn config_in(dir: &str) -> OpacidbConfig {
        OpacidbConfig {
            data_dir: dir.to_string(),
            database_file: DEFAULT_DATABASE_FILE.to_string(),
            document_file: DEFAULT_DOCUMENT_FILE.to_string(),
            distance_metric: DistanceMetric::Raw,
        }
    }

    #[test]
    fn test_default_config() {
        let config = OpacidbConfig::default();
        assert!(config.data_dir.ends_with(".opacidb"));
        assert_eq!(config.database_file, "opacities.db");
        assert_eq!(config.distance_metric, DistanceMetric::Raw);
    }

    #[test]
    fn test_paths() {
        let config = config_in("/test/dir/");
        assert_eq!(config.sqlite_path(), "/test/dir/opacities.db");
        assert_eq!(config.document_path(), "/test/dir/opacities.json");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("opacidb.toml");
        std::fs::write(
            &path,
            "data_dir = \"/srv/opacities\"\ndatabase_file = \"cia.db\"\ndistance_metric = \"normalized\"\n",
        )
        .unwrap();

        let config = OpacidbConfig::new(&Some(path.to_str().unwrap().to_string())).unwrap();
        assert_eq!(config.data_dir, "/srv/opacities");
        assert_eq!(config.sqlite_path(), "/srv/opacities/cia.db");
        assert_eq!(config.document_file, DEFAULT_DOCUMENT_FILE);
        assert_eq!(config.distance_metric, DistanceMetric::Normalized);
    }

    #[test]
    fn test_invalid_metric_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("opacidb.toml");
        std::fs::write(&path, "distance_metric = \"manhattan\"\n").unwrap();

        assert!(OpacidbConfig::new(&Some(path.to_str().unwrap().to_string())).is_err());
    }

    #[test]
    fn test_missing_file_writes_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.toml");

        OpacidbConfig::new(&Some(path.to_str().unwrap().to_string())).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("### opacidb configuration file"));
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("~/data", "/home/a"), "/home/a/data");
        assert_eq!(expand_home("~", "/home/a"), "/home/a");
        assert_eq!(expand_home("/abs/~/x", "/home/a"), "/abs/~/x");
    }

    #[test]
    fn test_sqlite_info() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path().to_str().unwrap());

        let info = get_sqlite_info(&config);
        assert!(!info.exists);
        assert!(info.continuum_count.is_none());

        {
            let header = OpacityHeader::linear(1.0, 2.0, 2, OpacityUnits::default()).unwrap();
            let db = OpacityDatabase::create(&config.sqlite_path(), &header).unwrap();
            db.continuum().insert("H2H2", 300.0, &[0.0, 0.0]).unwrap();
        }

        let info = get_sqlite_info(&config);
        assert!(info.exists);
        assert_eq!(info.schema_status.as_deref(), Some("current"));
        assert_eq!(info.schema_version, Some(crate::database::SCHEMA_VERSION));
        assert_eq!(info.grid_len, Some(2));
        assert_eq!(info.continuum_count, Some(1));
        assert_eq!(info.molecular_count, Some(0));
    }

    #[test]
    fn test_document_info_missing() {
        let dir = tempfile::tempdir().unwrap();
        let info = get_document_info(&config_in(dir.path().to_str().unwrap()));
        assert!(!info.exists);
        assert!(info.grid_len.is_none());
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1024), "1.00 KB");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(1048576), "1.00 MB");
        assert_eq!(format_size(1073741824), "1.00 GB");
    }
}
