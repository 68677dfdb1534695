//! sloppy.io project file output

use super::file::SloppyFile;
use crate::error::Result;
use std::path::{Path, PathBuf};

/// Output encoding of a project file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

impl OutputFormat {
    /// Format implied by a file extension, YAML unless `.json`
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => OutputFormat::Json,
            _ => OutputFormat::Yaml,
        }
    }
}

/// Renders and writes project files
pub struct SloppyWriter;

impl SloppyWriter {
    /// Render a resolved project file. Key order is fixed by the types, so
    /// equal files always render to equal text.
    pub fn to_string(file: &SloppyFile, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Yaml => Ok(serde_yaml::to_string(file)?),
            OutputFormat::Json => {
                let mut out = serde_json::to_string_pretty(file)?;
                out.push('\n');
                Ok(out)
            }
        }
    }

    /// Append `.yml` unless the path already has a known extension
    pub fn ensure_file_ending(path: &Path) -> PathBuf {
        let known = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| matches!(ext.to_ascii_lowercase().as_str(), "yml" | "yaml" | "json"));
        if known {
            return path.to_path_buf();
        }

        let mut name = path.as_os_str().to_os_string();
        name.push(".yml");
        PathBuf::from(name)
    }

    /// Write a project file, returning the path actually written
    pub fn write_file(file: &SloppyFile, path: &Path) -> Result<PathBuf> {
        let path = Self::ensure_file_ending(path);
        let content = Self::to_string(file, OutputFormat::from_path(&path))?;
        std::fs::write(&path, content)?;
        tracing::info!("Wrote {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sloppy::file::{App, DEFAULT_GROUP};
    use tempfile::tempdir;

    fn sample() -> SloppyFile {
        let mut file = SloppyFile::new("Demo");
        let mut app = App {
            image: "nginx".to_string(),
            port: Some(80),
            ..Default::default()
        };
        app.set_env("DB_HOST", "db.apps.demo:3306");
        app.add_dependency("../apps/db".to_string());
        file.services
            .get_mut(DEFAULT_GROUP)
            .unwrap()
            .insert("web".to_string(), app);
        file
    }

    #[test]
    fn test_ensure_file_ending() {
        assert_eq!(
            SloppyWriter::ensure_file_ending(Path::new("demo")),
            PathBuf::from("demo.yml")
        );
        assert_eq!(
            SloppyWriter::ensure_file_ending(Path::new("out/demo.yml")),
            PathBuf::from("out/demo.yml")
        );
        assert_eq!(
            SloppyWriter::ensure_file_ending(Path::new("demo.json")),
            PathBuf::from("demo.json")
        );
        assert_eq!(
            SloppyWriter::ensure_file_ending(Path::new("my.project")),
            PathBuf::from("my.project.yml")
        );
    }

    #[test]
    fn test_yaml_shape() {
        let out = SloppyWriter::to_string(&sample(), OutputFormat::Yaml).unwrap();
        assert!(out.starts_with("version: v1\nproject: demo\n"));
        assert!(!out.contains("null"));
        assert!(!out.contains("cmd"));
        assert!(!out.contains("port_mappings"));

        let value: serde_yaml::Value = serde_yaml::from_str(&out).unwrap();
        let web = &value["services"]["apps"]["web"];
        assert_eq!(web["image"].as_str(), Some("nginx"));
        assert_eq!(web["port"].as_u64(), Some(80));
        assert_eq!(web["env"][0]["DB_HOST"].as_str(), Some("db.apps.demo:3306"));
        assert_eq!(web["dependencies"][0].as_str(), Some("../apps/db"));
    }

    #[test]
    fn test_json_output() {
        let out = SloppyWriter::to_string(&sample(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["project"], "demo");
        assert_eq!(value["services"]["apps"]["web"]["env"][0]["DB_HOST"], "db.apps.demo:3306");
    }

    #[test]
    fn test_write_file_is_deterministic() {
        let dir = tempdir().unwrap();
        let first = SloppyWriter::write_file(&sample(), &dir.path().join("a")).unwrap();
        let second = SloppyWriter::write_file(&sample(), &dir.path().join("b")).unwrap();
        assert_eq!(first, dir.path().join("a.yml"));
        assert_eq!(
            std::fs::read_to_string(first).unwrap(),
            std::fs::read_to_string(second).unwrap()
        );
    }
}
