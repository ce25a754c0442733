//! Application configuration
//!
//! Catalog rules (category set, extension allow-list, listing cap) are
//! static constants frozen into a `CatalogRules` value at start-up.
//! Server settings come from environment variables with defaults so the
//! server can start with zero configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

// ===== Catalog Rules =====

/// Categories a note may be filed under
pub const CATEGORIES: &[&str] = &[
    "Mathematics",
    "Computer Science",
    "Physics",
    "Chemistry",
    "Biology",
    "Humanities",
    "Other",
];

/// Upload extensions accepted by the catalog (lower-case, without the dot)
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "ppt", "pptx", "txt", "jpg", "jpeg", "png",
];

/// Maximum number of notes returned by a listing query
pub const LISTING_LIMIT: i64 = 30;

// ===== Resource Limits =====

/// Default request body cap for uploads (50 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Longest sanitized filename kept in a stored name
pub const MAX_FILENAME_LENGTH: usize = 120;

/// How long a login session stays valid (7 days)
pub const SESSION_TTL_HOURS: i64 = 7 * 24;

/// Read-only validation rules shared by the catalog and the HTTP layer.
#[derive(Debug, Clone)]
pub struct CatalogRules {
    categories: Vec<String>,
    extensions: Vec<String>,
}

impl CatalogRules {
    pub fn new(categories: &[&str], extensions: &[&str]) -> Self {
        Self {
            categories: categories.iter().map(|c| c.to_string()).collect(),
            extensions: extensions.iter().map(|e| e.to_ascii_lowercase()).collect(),
        }
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Exact, case-sensitive membership test
    pub fn is_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }

    /// Extension after the last `.`, compared case-insensitively.
    /// A filename without a `.` is never allowed.
    pub fn is_allowed_filename(&self, filename: &str) -> bool {
        match filename.rsplit_once('.') {
            Some((_, ext)) => {
                let ext = ext.to_ascii_lowercase();
                self.extensions.iter().any(|allowed| *allowed == ext)
            }
            None => false,
        }
    }
}

impl Default for CatalogRules {
    fn default() -> Self {
        Self::new(CATEGORIES, ALLOWED_EXTENSIONS)
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:5000`
    pub http_addr: SocketAddr,

    /// Directory holding the database file and the uploads directory.
    /// Env: `DATA_DIR`
    /// Default: `./data`
    pub data_dir: PathBuf,

    /// Maximum request body size in bytes.
    /// Env: `MAX_UPLOAD_BYTES`
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], 5000).into(),
            data_dir: PathBuf::from("./data"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            match addr.parse::<SocketAddr>() {
                Ok(parsed) => config.http_addr = parsed,
                Err(_) => tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default"),
            }
        }

        if let Ok(dir) = std::env::var("DATA_DIR") {
            if !dir.is_empty() {
                config.data_dir = PathBuf::from(dir);
            }
        }

        if let Ok(val) = std::env::var("MAX_UPLOAD_BYTES") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.max_upload_bytes = n,
                _ => tracing::warn!(value = %val, "Invalid MAX_UPLOAD_BYTES, using default"),
            }
        }

        config
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("notes.db")
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }
}
