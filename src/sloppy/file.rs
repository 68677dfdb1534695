//! sloppy.io project file types

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Version tag written into every project file
pub const FILE_VERSION: &str = "v1";

/// Service group all converted apps are placed in
pub const DEFAULT_GROUP: &str = "apps";

/// Apps of one service group, by app name
pub type Apps = BTreeMap<String, App>;

/// sloppy.io project file
///
/// Field order is the serialization order, so `version` always comes first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SloppyFile {
    /// File format version
    pub version: String,
    /// Lower-cased project name
    pub project: String,
    /// Service groups by name
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub services: BTreeMap<String, Apps>,
}

impl SloppyFile {
    /// Create an empty project with the default service group
    pub fn new(project: &str) -> Self {
        let mut services = BTreeMap::new();
        services.insert(DEFAULT_GROUP.to_string(), Apps::new());
        Self {
            version: FILE_VERSION.to_string(),
            project: project.to_lowercase(),
            services,
        }
    }

    /// Look up an app by group and name
    pub fn app(&self, group: &str, name: &str) -> Option<&App> {
        self.services.get(group).and_then(|apps| apps.get(name))
    }

    /// Sort list fields so serialized output is stable
    pub fn sort_fields(&mut self) {
        for app in self.services.values_mut().flat_map(|apps| apps.values_mut()) {
            app.sort_fields();
        }
    }
}

/// A deployable sloppy.io app
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct App {
    /// Docker image
    pub image: String,
    /// Command line, tokens joined by spaces
    #[serde(rename = "cmd", skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Domain URI
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Memory in MB
    #[serde(rename = "mem", skip_serializing_if = "Option::is_none")]
    pub memory: Option<u64>,
    /// Instance count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instances: Option<u32>,
    /// Environment variables for lookups; `env` is what gets written
    #[serde(skip)]
    pub env_vars: BTreeMap<String, String>,
    /// Environment variables as written to the file
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
    /// Exposed container port
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// All container ports. The YAML dialect only carries `port`.
    #[serde(skip)]
    pub port_mappings: Vec<PortMapping>,
    /// Relative paths of the apps this one depends on
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    /// Volumes
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Volume>,
    /// Logging configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<Logging>,
}

impl App {
    /// Set an environment variable in both representations
    pub fn set_env(&mut self, key: &str, value: &str) {
        self.env_vars.insert(key.to_string(), value.to_string());
        match self.env.iter_mut().find(|var| var.key == key) {
            Some(var) => var.value = value.to_string(),
            None => self.env.push(EnvVar::new(key, value)),
        }
    }

    /// Add a dependency path unless it is already present.
    /// Returns whether it was added.
    pub fn add_dependency(&mut self, path: String) -> bool {
        if self.dependencies.contains(&path) {
            return false;
        }
        self.dependencies.push(path);
        true
    }

    /// Container ports of all port mappings
    pub fn container_ports(&self) -> Vec<u16> {
        self.port_mappings.iter().map(|pm| pm.port).collect()
    }

    pub fn sort_fields(&mut self) {
        self.env.sort();
        self.dependencies.sort();
    }
}

/// One environment variable, written as a single-key mapping
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct EnvVar {
    pub key: String,
    pub value: String,
}

impl EnvVar {
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

impl Serialize for EnvVar {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.key, &self.value)?;
        map.end()
    }
}

/// Port mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PortMapping {
    /// Container port
    pub port: u16,
}

/// Volume mounted into the app
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Volume {
    /// Path inside the container
    pub container_path: String,
}

/// Logging driver and its options
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Logging {
    pub driver: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, String>,
}
