//! Docker Compose configuration types
//!
//! Only the subset of the compose schema that has a sloppy.io counterpart is
//! modelled here. Unknown keys are ignored by serde.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Docker Compose file configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComposeConfig {
    /// Compose file version
    #[serde(default)]
    pub version: Option<ScalarValue>,
    /// Project name (top-level name)
    #[serde(default)]
    pub name: Option<String>,
    /// Services
    #[serde(default)]
    pub services: HashMap<String, ServiceConfig>,
}

/// Normalized compose project, as handed to the converter
#[derive(Debug, Clone, Default)]
pub struct ComposeFile {
    /// Lower-cased project name
    pub project_name: String,
    /// Service name to configuration
    pub services: BTreeMap<String, ServiceConfig>,
}

/// Service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Image name
    #[serde(default)]
    pub image: Option<String>,
    /// Build configuration
    #[serde(default)]
    pub build: Option<BuildConfig>,
    /// Command to run
    #[serde(default)]
    pub command: Option<CommandConfig>,
    /// Domain name
    #[serde(default)]
    pub domainname: Option<String>,
    /// Environment variables
    #[serde(default)]
    pub environment: Option<EnvironmentConfig>,
    /// Environment file
    #[serde(default)]
    pub env_file: Option<EnvFileConfig>,
    /// Port mappings
    #[serde(default)]
    pub ports: Option<Vec<PortConfig>>,
    /// Volume mounts
    #[serde(default)]
    pub volumes: Option<Vec<VolumeMount>>,
    /// Service dependencies
    #[serde(default)]
    pub depends_on: Option<DependsOnConfig>,
    /// Legacy links ("service" or "service:alias")
    #[serde(default)]
    pub links: Option<Vec<String>>,
    /// Deploy configuration
    #[serde(default)]
    pub deploy: Option<DeployConfig>,
    /// Memory limit (version 2 syntax)
    #[serde(default)]
    pub mem_limit: Option<ScalarValue>,
    /// Logging configuration
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
}

impl ServiceConfig {
    /// Names of the services declared in `depends_on` and `links`
    pub fn declared_dependencies(&self) -> Vec<String> {
        let mut deps = self
            .depends_on
            .as_ref()
            .map(DependsOnConfig::names)
            .unwrap_or_default();

        for link in self.links.iter().flatten() {
            let service = link.split(':').next().unwrap_or(link).trim();
            if !service.is_empty() && !deps.iter().any(|d| d == service) {
                deps.push(service.to_string());
            }
        }
        deps
    }
}

/// Plain YAML scalar, rendered to a string where sloppy expects one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl std::fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalarValue::Bool(b) => write!(f, "{}", b),
            ScalarValue::Int(i) => write!(f, "{}", i),
            ScalarValue::Float(v) => write!(f, "{}", v),
            ScalarValue::String(s) => write!(f, "{}", s),
        }
    }
}

/// Build configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BuildConfig {
    /// Simple context path
    Simple(String),
    /// Full build configuration
    Full(BuildConfigFull),
}

impl BuildConfig {
    /// Whether this actually asks for an image build
    pub fn is_requested(&self) -> bool {
        match self {
            BuildConfig::Simple(context) => !context.trim().is_empty(),
            BuildConfig::Full(_) => true,
        }
    }
}

/// Full build configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildConfigFull {
    /// Build context
    pub context: Option<String>,
    /// Dockerfile path
    pub dockerfile: Option<String>,
    /// Build arguments
    #[serde(default)]
    pub args: Option<HashMap<String, ScalarValue>>,
    /// Target stage
    pub target: Option<String>,
}

/// Command configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandConfig {
    /// Shell command string
    Shell(String),
    /// Exec form array
    Exec(Vec<String>),
}

/// Environment configuration, either `KEY=value` list or mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvironmentConfig {
    /// Array of KEY=value strings
    Array(Vec<String>),
    /// Map of key to value
    Map(HashMap<String, Option<ScalarValue>>),
}

impl EnvironmentConfig {
    /// Key/value pairs in declaration order. `None` marks a pass-through
    /// variable without a value (`KEY` or `KEY:`).
    pub fn entries(&self) -> Vec<(String, Option<String>)> {
        match self {
            EnvironmentConfig::Array(arr) => arr
                .iter()
                .map(|item| match item.split_once('=') {
                    Some((k, v)) => (k.to_string(), Some(v.to_string())),
                    None => (item.clone(), None),
                })
                .collect(),
            EnvironmentConfig::Map(map) => {
                let mut entries: Vec<_> = map
                    .iter()
                    .map(|(k, v)| (k.clone(), v.as_ref().map(ScalarValue::to_string)))
                    .collect();
                entries.sort_by(|a, b| a.0.cmp(&b.0));
                entries
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            EnvironmentConfig::Array(arr) => arr.is_empty(),
            EnvironmentConfig::Map(map) => map.is_empty(),
        }
    }
}

/// Env file configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvFileConfig {
    /// Single file
    Single(String),
    /// Multiple files
    Multiple(Vec<String>),
}

impl EnvFileConfig {
    pub fn paths(&self) -> Vec<&str> {
        match self {
            EnvFileConfig::Single(path) => vec![path.as_str()],
            EnvFileConfig::Multiple(paths) => paths.iter().map(String::as_str).collect(),
        }
    }
}

/// Port configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortConfig {
    /// Bare container port: 80
    Number(u32),
    /// Short syntax: "8080:80"
    Short(String),
    /// Long syntax
    Long(PortConfigLong),
}

/// Long port configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortConfigLong {
    /// Target port in container
    pub target: u16,
    /// Published port on host
    pub published: Option<ScalarValue>,
    /// Protocol (tcp/udp)
    pub protocol: Option<String>,
    /// Mode (host/ingress)
    pub mode: Option<String>,
}

/// Volume mount configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VolumeMount {
    /// Short syntax: "host:container:mode"
    Short(String),
    /// Long syntax
    Long(VolumeMountLong),
}

/// Long volume mount configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VolumeMountLong {
    /// Mount type (volume, bind, tmpfs, npipe)
    #[serde(rename = "type")]
    pub mount_type: Option<String>,
    /// Source path or volume name
    pub source: Option<String>,
    /// Target path in container
    pub target: String,
    /// Read only
    pub read_only: Option<bool>,
}

/// Depends on configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependsOnConfig {
    /// Array of service names
    Array(Vec<String>),
    /// Map of service to condition
    Map(HashMap<String, DependsOnCondition>),
}

impl DependsOnConfig {
    pub fn names(&self) -> Vec<String> {
        match self {
            DependsOnConfig::Array(arr) => arr.clone(),
            DependsOnConfig::Map(map) => {
                let mut names: Vec<_> = map.keys().cloned().collect();
                names.sort();
                names
            }
        }
    }
}

/// Depends on condition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependsOnCondition {
    /// Condition to wait for
    pub condition: String,
}

/// Deploy configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Number of replicas
    pub replicas: Option<u32>,
    /// Resource limits and reservations
    pub resources: Option<ResourcesConfig>,
}

/// Resources configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourcesConfig {
    /// Resource limits
    pub limits: Option<ResourceSpec>,
    /// Resource reservations
    pub reservations: Option<ResourceSpec>,
}

/// Resource specification
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceSpec {
    /// CPU limit/reservation
    pub cpus: Option<ScalarValue>,
    /// Memory limit/reservation
    pub memory: Option<ScalarValue>,
}

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Driver
    pub driver: Option<String>,
    /// Options
    #[serde(default)]
    pub options: Option<HashMap<String, ScalarValue>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_entries_split_at_first_equals() {
        let env = EnvironmentConfig::Array(vec![
            "URL=http://x/?a=b".to_string(),
            "PASSTHROUGH".to_string(),
        ]);
        let entries = env.entries();
        assert_eq!(
            entries[0],
            ("URL".to_string(), Some("http://x/?a=b".to_string()))
        );
        assert_eq!(entries[1], ("PASSTHROUGH".to_string(), None));
    }

    #[test]
    fn test_environment_map_scalars() {
        let env: EnvironmentConfig =
            serde_yaml::from_str("PORT: 8080\nDEBUG: true\nNAME: web\nEMPTY:\n").unwrap();
        let entries = env.entries();
        assert_eq!(
            entries,
            vec![
                ("DEBUG".to_string(), Some("true".to_string())),
                ("EMPTY".to_string(), None),
                ("NAME".to_string(), Some("web".to_string())),
                ("PORT".to_string(), Some("8080".to_string())),
            ]
        );
    }

    #[test]
    fn test_declared_dependencies_merges_links() {
        let service: ServiceConfig = serde_yaml::from_str(
            r#"
image: app
depends_on:
  - db
links:
  - db:database
  - cache
"#,
        )
        .unwrap();
        assert_eq!(service.declared_dependencies(), vec!["db", "cache"]);
    }

    #[test]
    fn test_depends_on_map_form() {
        let service: ServiceConfig = serde_yaml::from_str(
            r#"
image: app
depends_on:
  redis:
    condition: service_started
  db:
    condition: service_healthy
"#,
        )
        .unwrap();
        assert_eq!(service.declared_dependencies(), vec!["db", "redis"]);
    }

    #[test]
    fn test_build_is_requested() {
        assert!(BuildConfig::Simple("./app".to_string()).is_requested());
        assert!(!BuildConfig::Simple("  ".to_string()).is_requested());
        assert!(BuildConfig::Full(BuildConfigFull::default()).is_requested());
    }
}
