use std::path::PathBuf;

const DEFAULT_GALLERY_CAPACITY: usize = 1000;
const DEFAULT_NUM_MATCHES: usize = 5;

/// Worker configuration, loaded from environment variables and passed into
/// worker construction by value.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the persisted gallery file.
    pub gallery_path: PathBuf,
    /// Entries the gallery is trimmed to on every persist.
    pub gallery_capacity: usize,
    /// Gallery candidates retained per face by the matching stage.
    pub num_matches: usize,
}

impl Config {
    /// Load configuration from `MIRADOR_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("mirador");

        let gallery_path = std::env::var("MIRADOR_GALLERY_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("gallery.bin"));

        Self {
            gallery_path,
            gallery_capacity: env_usize("MIRADOR_GALLERY_CAPACITY", DEFAULT_GALLERY_CAPACITY),
            num_matches: env_usize("MIRADOR_NUM_MATCHES", DEFAULT_NUM_MATCHES),
        }
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
