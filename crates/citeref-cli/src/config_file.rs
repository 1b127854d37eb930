use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub paths: Option<PathsConfig>,
    pub sources: Option<SourcesConfig>,
    pub pubmed: Option<PubMedConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    pub ltwa_cache_dir: Option<String>,
    pub journals_db: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcesConfig {
    pub ltwa_url: Option<String>,
    pub medline_url: Option<String>,
    pub crossref_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PubMedConfig {
    pub chunk_size: Option<usize>,
    pub wait_ms: Option<u64>,
    pub efetch_url: Option<String>,
}

/// Platform config directory path: `<config_dir>/citeref/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("citeref").join("config.toml"))
}

/// Load config by cascading CWD `.citeref.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".citeref.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config file");
            None
        }
    }
}

/// Pick the overlay's value of a field, falling back to the base's.
fn pick<S, T>(base: &Option<S>, overlay: &Option<S>, field: impl Fn(&S) -> Option<T>) -> Option<T> {
    overlay
        .as_ref()
        .and_then(&field)
        .or_else(|| base.as_ref().and_then(&field))
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        paths: Some(PathsConfig {
            ltwa_cache_dir: pick(&base.paths, &overlay.paths, |p| p.ltwa_cache_dir.clone()),
            journals_db: pick(&base.paths, &overlay.paths, |p| p.journals_db.clone()),
        }),
        sources: Some(SourcesConfig {
            ltwa_url: pick(&base.sources, &overlay.sources, |s| s.ltwa_url.clone()),
            medline_url: pick(&base.sources, &overlay.sources, |s| s.medline_url.clone()),
            crossref_url: pick(&base.sources, &overlay.sources, |s| s.crossref_url.clone()),
        }),
        pubmed: Some(PubMedConfig {
            chunk_size: pick(&base.pubmed, &overlay.pubmed, |p| p.chunk_size),
            wait_ms: pick(&base.pubmed, &overlay.pubmed, |p| p.wait_ms),
            efetch_url: pick(&base.pubmed, &overlay.pubmed, |p| p.efetch_url.clone()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_parses() {
        let toml_str = "[pubmed]\nwait_ms = 340\n";
        let parsed: ConfigFile = toml::from_str(toml_str).unwrap();
        assert_eq!(parsed.pubmed.unwrap().wait_ms, Some(340));
        assert!(parsed.paths.is_none());
    }

    #[test]
    fn round_trip_toml() {
        let config = ConfigFile {
            paths: Some(PathsConfig {
                journals_db: Some("/tmp/journals.db".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: ConfigFile = toml::from_str(&toml_str).unwrap();
        assert_eq!(
            parsed.paths.unwrap().journals_db.as_deref(),
            Some("/tmp/journals.db")
        );
    }

    #[test]
    fn merge_overlay_wins() {
        let base = ConfigFile {
            paths: Some(PathsConfig {
                ltwa_cache_dir: Some("/base/ltwa".to_string()),
                journals_db: Some("/base/journals.db".to_string()),
            }),
            pubmed: Some(PubMedConfig {
                chunk_size: Some(100),
                ..Default::default()
            }),
            ..Default::default()
        };
        let overlay = ConfigFile {
            paths: Some(PathsConfig {
                ltwa_cache_dir: Some("/overlay/ltwa".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let merged = merge(base, overlay);
        let paths = merged.paths.unwrap();
        assert_eq!(paths.ltwa_cache_dir.as_deref(), Some("/overlay/ltwa"));
        assert_eq!(paths.journals_db.as_deref(), Some("/base/journals.db"));
        assert_eq!(merged.pubmed.unwrap().chunk_size, Some(100));
        assert_eq!(merged.sources.unwrap().ltwa_url, None);
    }

    #[test]
    fn unreadable_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[paths\nbroken").unwrap();
        assert!(load_from_path(&path).is_none());
        assert!(load_from_path(&dir.path().join("missing.toml")).is_none());
    }
}
