use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Which backing store the project data lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sqlite,
    Json,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Sqlite => write!(f, "sqlite"),
            Backend::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ProjetoxConfig {
    pub backend: Option<Backend>,
    pub data_dir: Option<String>,
    pub database: Option<String>,
    pub documents: Option<String>,
}

impl ProjetoxConfig {
    pub fn backend(&self) -> Backend {
        self.backend.unwrap_or_default()
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data"))
    }

    /// SQLite file: `database` if set, else `<data_dir>/projetox.sqlite3`.
    ///
    /// The desktop app keeps `projetox.db` in the same directory with a
    /// different table layout, so the default stays clear of it.
    pub fn database_path(&self) -> PathBuf {
        match &self.database {
            Some(path) => PathBuf::from(path),
            None => self.data_dir().join("projetox.sqlite3"),
        }
    }

    /// JSON document: `documents` if set, else `<data_dir>/dados_projetos.json`
    pub fn documents_path(&self) -> PathBuf {
        match &self.documents {
            Some(path) => PathBuf::from(path),
            None => self.data_dir().join("dados_projetos.json"),
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("projetox.toml")
}

const CONFIG_HEADER: &str = "# ProjetoX settings\n# backend = \"sqlite\" | \"json\"\n\n";

impl ProjetoxConfig {
    /// Read settings from `path`. A missing file means all defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
        };
        toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
    }

    /// A command-line `--backend` wins over the file
    pub fn with_backend(mut self, backend: Option<Backend>) -> Self {
        if backend.is_some() {
            self.backend = backend;
        }
        self
    }

    /// Write the settings to `path`; an existing file is only replaced with `force`
    pub fn save(&self, path: &Path, force: bool) -> anyhow::Result<()> {
        if path.exists() && !force {
            anyhow::bail!("{} already exists, pass --force to replace it", path.display());
        }
        ensure_parent_dir(path)?;
        let body = toml::to_string_pretty(self).context("serializing settings")?;
        std::fs::write(path, format!("{}{}", CONFIG_HEADER, body))
            .with_context(|| format!("writing {}", path.display()))
    }
}

/// Create the directory a data file lives in, if it is missing
pub fn ensure_parent_dir(file: &Path) -> std::io::Result<()> {
    if let Some(parent) = file.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let config = ProjetoxConfig::default();
        assert_eq!(config.backend(), Backend::Sqlite);
        assert_eq!(config.database_path(), PathBuf::from("data").join("projetox.sqlite3"));
        assert_eq!(
            config.documents_path(),
            PathBuf::from("data").join("dados_projetos.json")
        );
    }

    #[test]
    fn test_explicit_paths_win() {
        let config = ProjetoxConfig {
            backend: Some(Backend::Json),
            data_dir: Some("/var/lib/projetox".into()),
            database: None,
            documents: Some("/tmp/projects.json".into()),
        };
        assert_eq!(config.database_path(), PathBuf::from("/var/lib/projetox/projetox.sqlite3"));
        assert_eq!(config.documents_path(), PathBuf::from("/tmp/projects.json"));
    }

    #[test]
    fn test_load_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("projetox.toml");
        assert_eq!(ProjetoxConfig::load(&path).unwrap(), ProjetoxConfig::default());

        std::fs::write(&path, "backend = \"json\"\ndata_dir = \"store\"\n").unwrap();
        let config = ProjetoxConfig::load(&path).unwrap();
        assert_eq!(config.backend(), Backend::Json);
        assert_eq!(config.documents_path(), PathBuf::from("store").join("dados_projetos.json"));

        assert!(config.save(&path, false).is_err());
        ProjetoxConfig::default().save(&path, true).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().starts_with("# ProjetoX settings"));
        assert_eq!(ProjetoxConfig::load(&path).unwrap(), ProjetoxConfig::default());
    }

    #[test]
    fn test_malformed_config_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("projetox.toml");
        std::fs::write(&path, "backend = \"postgres\"\n").unwrap();

        let err = ProjetoxConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("projetox.toml"));
    }

    #[test]
    fn test_cli_backend_overrides_file() {
        let config = ProjetoxConfig { backend: Some(Backend::Json), ..Default::default() };
        assert_eq!(config.clone().with_backend(None).backend(), Backend::Json);
        assert_eq!(config.with_backend(Some(Backend::Sqlite)).backend(), Backend::Sqlite);
    }

    #[test]
    fn test_ensure_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("nested").join("data").join("projetox.db");
        ensure_parent_dir(&file).unwrap();
        assert!(file.parent().unwrap().is_dir());
    }
}
