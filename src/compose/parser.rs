//! Docker Compose file loader
//!
//! Turns raw compose documents into a normalized [`ComposeFile`]: versions
//! are checked, `${VAR}` references interpolated, documents merged, env files
//! read and the project name derived.

use super::config::{ComposeConfig, ComposeFile, EnvironmentConfig, ScalarValue, ServiceConfig};
use crate::error::{Result, SlopposeError};
use regex::{Captures, Regex};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Default compose file names, in lookup order
pub const DEFAULT_COMPOSE_FILES: &[&str] = &[
    "docker-compose.yml",
    "docker-compose.yaml",
    "compose.yml",
    "compose.yaml",
];

/// Environment variable overriding the project name
pub const ENV_COMPOSE_PROJECT_NAME: &str = "COMPOSE_PROJECT_NAME";

/// Project name used when nothing else yields one
pub const DEFAULT_PROJECT_NAME: &str = "sloppyio";

/// Compose version families this loader understands
const SUPPORTED_VERSIONS: &[&str] = &["2", "3"];

static INTERPOLATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\$(?:(\$)|\{([A-Za-z_][A-Za-z0-9_]*)(?:(:?-)([^}]*))?\}|([A-Za-z_][A-Za-z0-9_]*))",
    )
    .expect("interpolation pattern is valid")
});

#[derive(Deserialize)]
struct VersionHeader {
    #[serde(default)]
    version: Option<ScalarValue>,
}

/// Inputs to a load besides the documents themselves
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit project name, wins over everything else
    pub project_name: Option<String>,
    /// Directory env files are resolved against and the default project
    /// name is taken from
    pub working_dir: PathBuf,
    /// Variables used for interpolation and pass-through values
    pub env: HashMap<String, String>,
}

impl LoadOptions {
    /// Options backed by the process environment
    pub fn from_env(project_name: Option<String>, working_dir: PathBuf) -> Self {
        Self {
            project_name,
            working_dir,
            env: std::env::vars().collect(),
        }
    }
}

/// Compose file parser
pub struct ComposeParser;

impl ComposeParser {
    /// Find compose file in directory
    pub fn find_compose_file(dir: &Path) -> Option<PathBuf> {
        for name in DEFAULT_COMPOSE_FILES {
            let path = dir.join(name);
            if path.exists() {
                return Some(path);
            }
        }
        None
    }

    /// Read compose documents from disk
    pub fn read_files(paths: &[PathBuf]) -> Result<Vec<String>> {
        if paths.is_empty() {
            return Err(SlopposeError::Input(
                "at least one compose file is required".to_string(),
            ));
        }

        paths
            .iter()
            .map(|path| {
                std::fs::read_to_string(path).map_err(|e| {
                    SlopposeError::Input(format!("failed to read {}: {}", path.display(), e))
                })
            })
            .collect()
    }

    /// Load and normalize one or more compose documents
    pub fn load(documents: &[String], options: &LoadOptions) -> Result<ComposeFile> {
        if documents.iter().all(|doc| doc.trim().is_empty()) {
            return Err(SlopposeError::Input(
                "at least one compose file with content is required".to_string(),
            ));
        }

        let config = Self::parse_documents(documents, &options.env)?;
        let project_name = resolve_project_name(
            options.project_name.as_deref(),
            options.env.get(ENV_COMPOSE_PROJECT_NAME).map(String::as_str),
            config.name.as_deref(),
            &options.working_dir,
        );

        let mut services: BTreeMap<String, ServiceConfig> = config.services.into_iter().collect();
        for (name, service) in services.iter_mut() {
            normalize_environment(name, service, &options.working_dir, &options.env)?;
        }

        let file = ComposeFile {
            project_name,
            services,
        };
        for warning in Self::validate(&file)? {
            tracing::warn!("{}", warning);
        }
        Ok(file)
    }

    /// Parse all documents, checking that they agree on one version
    pub fn parse_documents(
        documents: &[String],
        env: &HashMap<String, String>,
    ) -> Result<ComposeConfig> {
        let mut declared: Option<String> = None;
        let mut config = ComposeConfig::default();

        for content in documents.iter().filter(|doc| !doc.trim().is_empty()) {
            let version = Self::parse_version(content)?;
            match &declared {
                Some(first) if *first != version => {
                    return Err(SlopposeError::Schema(format!(
                        "compose files declare different versions: {} and {}",
                        first, version
                    )));
                }
                Some(_) => {}
                None => declared = Some(version),
            }

            let file_config = Self::parse_str(content, env)?;
            config = Self::merge_configs(config, file_config);
        }

        Ok(config)
    }

    /// Read the declared version and make sure it is a supported family
    pub fn parse_version(content: &str) -> Result<String> {
        let header: VersionHeader = serde_yaml::from_str(content)
            .map_err(|e| SlopposeError::Schema(format!("failed to parse YAML: {}", e)))?;

        let version = header
            .version
            .map(|v| v.to_string().trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                SlopposeError::Schema("missing version declaration in compose file".to_string())
            })?;

        let family = version.split('.').next().unwrap_or_default();
        if !SUPPORTED_VERSIONS.contains(&family) {
            return Err(SlopposeError::UnsupportedVersion(version));
        }
        Ok(version)
    }

    /// Parse a single compose document, interpolating variables first
    pub fn parse_str(content: &str, env: &HashMap<String, String>) -> Result<ComposeConfig> {
        let mut value: serde_yaml::Value = serde_yaml::from_str(content)
            .map_err(|e| SlopposeError::Schema(format!("failed to parse YAML: {}", e)))?;
        interpolate_value(&mut value, env);

        serde_yaml::from_value(value)
            .map_err(|e| SlopposeError::Schema(format!("invalid compose file: {}", e)))
    }

    /// Merge two compose configurations
    pub fn merge_configs(base: ComposeConfig, overlay: ComposeConfig) -> ComposeConfig {
        let mut result = base;

        // Merge version (overlay wins)
        if overlay.version.is_some() {
            result.version = overlay.version;
        }

        // Merge name (overlay wins)
        if overlay.name.is_some() {
            result.name = overlay.name;
        }

        for (name, service) in overlay.services {
            match result.services.get_mut(&name) {
                Some(existing) => merge_service(existing, service),
                None => {
                    result.services.insert(name, service);
                }
            }
        }

        result
    }

    /// Validate a loaded project, returning non-fatal warnings
    pub fn validate(file: &ComposeFile) -> Result<Vec<String>> {
        let mut warnings = Vec::new();

        for (name, service) in &file.services {
            // Service must have either image or build
            if service.image.is_none() && service.build.is_none() {
                return Err(SlopposeError::Schema(format!(
                    "Service '{}' must have either 'image' or 'build' specified",
                    name
                )));
            }

            for link in service.links.iter().flatten() {
                if link.contains(':') {
                    warnings.push(format!(
                        "Service '{}' link '{}': aliases are not supported and will be dropped",
                        name, link
                    ));
                }
            }
        }

        Ok(warnings)
    }
}

fn merge_service(existing: &mut ServiceConfig, overlay: ServiceConfig) {
    macro_rules! overlay_fields {
        ($($field:ident),* $(,)?) => {
            $(
                if overlay.$field.is_some() {
                    existing.$field = overlay.$field;
                }
            )*
        };
    }

    overlay_fields!(
        image,
        build,
        command,
        domainname,
        environment,
        env_file,
        ports,
        volumes,
        depends_on,
        links,
        deploy,
        mem_limit,
        logging,
    );
}

/// Pick the project name: explicit, then environment, then the compose
/// `name`, then the working directory. Always lower-cased.
pub fn resolve_project_name(
    explicit: Option<&str>,
    from_env: Option<&str>,
    from_file: Option<&str>,
    working_dir: &Path,
) -> String {
    let name = [explicit, from_env, from_file]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|name| !name.is_empty())
        .map(str::to_string)
        .or_else(|| {
            working_dir
                .file_name()
                .and_then(|s| s.to_str())
                .filter(|s| !s.is_empty() && *s != ".")
                .map(str::to_string)
        })
        .unwrap_or_else(|| DEFAULT_PROJECT_NAME.to_string());

    name.to_lowercase()
}

/// Fold env files and pass-through variables into a plain mapping
fn normalize_environment(
    service_name: &str,
    service: &mut ServiceConfig,
    base_dir: &Path,
    env: &HashMap<String, String>,
) -> Result<()> {
    let env_files = service.env_file.take();
    if env_files.is_none() && service.environment.is_none() {
        return Ok(());
    }

    let mut vars: BTreeMap<String, String> = BTreeMap::new();
    let mut set = |key: String, value: Option<String>| {
        match value.or_else(|| env.get(&key).cloned()) {
            Some(value) => {
                vars.insert(key, value);
            }
            None => tracing::debug!(
                "Service '{}': variable '{}' is not set, skipping",
                service_name,
                key
            ),
        }
    };

    for file in env_files.iter().flat_map(|f| f.paths()) {
        let path = base_dir.join(file);
        let content = std::fs::read_to_string(&path).map_err(|e| {
            SlopposeError::Input(format!(
                "Service '{}': failed to read env file {}: {}",
                service_name,
                path.display(),
                e
            ))
        })?;
        for (key, value) in parse_env_file(&content) {
            set(key, value);
        }
    }

    if let Some(environment) = &service.environment {
        for (key, value) in environment.entries() {
            set(key, value);
        }
    }

    service.environment = if vars.is_empty() {
        None
    } else {
        Some(EnvironmentConfig::Map(
            vars.into_iter()
                .map(|(k, v)| (k, Some(ScalarValue::String(v))))
                .collect(),
        ))
    };
    Ok(())
}

/// Parse `KEY=value` lines of an env file
fn parse_env_file(content: &str) -> Vec<(String, Option<String>)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            let line = line.strip_prefix("export ").unwrap_or(line);
            match line.split_once('=') {
                Some((key, value)) => (key.trim().to_string(), Some(unquote(value.trim()))),
                None => (line.to_string(), None),
            }
        })
        .collect()
}

fn unquote(value: &str) -> String {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return value[1..value.len() - 1].to_string();
        }
    }
    value.to_string()
}

fn interpolate_value(value: &mut serde_yaml::Value, env: &HashMap<String, String>) {
    match value {
        serde_yaml::Value::String(s) => {
            if s.contains('$') {
                *s = interpolate_string(s, env);
            }
        }
        serde_yaml::Value::Sequence(items) => {
            for item in items {
                interpolate_value(item, env);
            }
        }
        serde_yaml::Value::Mapping(map) => {
            for (_, item) in map.iter_mut() {
                interpolate_value(item, env);
            }
        }
        serde_yaml::Value::Tagged(tagged) => interpolate_value(&mut tagged.value, env),
        _ => {}
    }
}

/// Interpolate environment variables in a string.
///
/// Handles `$VAR`, `${VAR}`, `${VAR:-default}`, `${VAR-default}` and the
/// `$$` escape. Unset variables without default become empty.
fn interpolate_string(s: &str, env: &HashMap<String, String>) -> String {
    INTERPOLATION
        .replace_all(s, |caps: &Captures| {
            if caps.get(1).is_some() {
                return "$".to_string();
            }

            let var = caps
                .get(2)
                .or_else(|| caps.get(5))
                .map(|m| m.as_str())
                .unwrap_or_default();
            let value = env.get(var);

            match caps.get(3).map(|m| m.as_str()) {
                Some(":-") => value
                    .filter(|v| !v.is_empty())
                    .cloned()
                    .unwrap_or_else(|| caps[4].to_string()),
                Some(_) => value.cloned().unwrap_or_else(|| caps[4].to_string()),
                None => value.cloned().unwrap_or_else(|| {
                    tracing::warn!("The {} variable is not set, defaulting to a blank string", var);
                    String::new()
                }),
            }
        })
        .into_owned()
}
