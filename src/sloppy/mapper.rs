//! Compose service to sloppy app mapping

use super::file::{App, EnvVar, Logging, PortMapping, SloppyFile, Volume, DEFAULT_GROUP};
use crate::compose::config::{
    CommandConfig, ComposeFile, PortConfig, ScalarValue, ServiceConfig, VolumeMount,
};
use crate::error::{Result, SlopposeError};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Lowest memory size sloppy.io supports, in MB
pub const MIN_MEMORY_MB: u64 = 64;

static MEMORY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d+)\s*([bkmg])b?$").expect("memory pattern is valid")
});

/// Maps compose services onto sloppy apps
pub struct SchemaMapper;

impl SchemaMapper {
    /// Convert every service of a compose project. Dependencies are left
    /// to the linker.
    pub fn map_file(compose: &ComposeFile) -> Result<SloppyFile> {
        let mut file = SloppyFile::new(&compose.project_name);

        for (name, service) in &compose.services {
            let app = Self::map_service(name, service)?;
            tracing::debug!("Mapped service {} to app {}/{}", name, DEFAULT_GROUP, name);
            file.services
                .entry(DEFAULT_GROUP.to_string())
                .or_default()
                .insert(name.clone(), app);
        }

        file.sort_fields();
        Ok(file)
    }

    /// Convert a single service
    pub fn map_service(name: &str, service: &ServiceConfig) -> Result<App> {
        if service.build.as_ref().is_some_and(|b| b.is_requested()) {
            return Err(SlopposeError::UnsupportedFeature(format!(
                "service '{}': the build property is not supported, please specify an image instead",
                name
            )));
        }

        let image = service
            .image
            .clone()
            .filter(|image| !image.trim().is_empty())
            .ok_or_else(|| {
                SlopposeError::Schema(format!("service '{}' has no image", name))
            })?;

        let mut app = App {
            image,
            command: service.command.as_ref().and_then(convert_command),
            domain: service.domainname.clone().filter(|d| !d.is_empty()),
            volumes: service
                .volumes
                .iter()
                .flatten()
                .filter_map(convert_volume)
                .collect(),
            logging: convert_logging(service),
            ..Default::default()
        };

        if let Some(environment) = &service.environment {
            for (key, value) in environment.entries() {
                match value {
                    Some(value) => {
                        app.env_vars.insert(key, value);
                    }
                    None => tracing::debug!("service '{}': dropping unset variable {}", name, key),
                }
            }
            app.env = app
                .env_vars
                .iter()
                .map(|(k, v)| EnvVar::new(k, v))
                .collect();
        }

        if let Some(ports) = &service.ports {
            app.port_mappings = ports
                .iter()
                .map(|p| container_port(p).map(|port| PortMapping { port }))
                .collect::<Result<_>>()?;
            // The YAML dialect carries a single port, use the first one
            app.port = app.port_mappings.first().map(|pm| pm.port);
        }

        if let Some(deploy) = &service.deploy {
            app.instances = deploy.replicas.filter(|r| *r > 0);
        }

        let memory = service
            .deploy
            .as_ref()
            .and_then(|d| d.resources.as_ref())
            .and_then(|r| r.limits.as_ref())
            .and_then(|l| l.memory.as_ref())
            .or(service.mem_limit.as_ref());
        if let Some(memory) = memory {
            app.memory = Some(parse_memory(memory).map_err(|e| match e {
                SlopposeError::Schema(msg) => {
                    SlopposeError::Schema(format!("service '{}': {}", name, msg))
                }
                other => other,
            })?);
        }

        Ok(app)
    }
}

fn convert_command(command: &CommandConfig) -> Option<String> {
    let cmd = match command {
        CommandConfig::Shell(cmd) => cmd.trim().to_string(),
        CommandConfig::Exec(tokens) => tokens.join(" "),
    };
    (!cmd.trim().is_empty()).then_some(cmd)
}

fn convert_volume(volume: &VolumeMount) -> Option<Volume> {
    let path = match volume {
        VolumeMount::Short(spec) => {
            let mut parts = spec.split(':');
            let first = parts.next().unwrap_or_default();
            parts.next().unwrap_or(first)
        }
        VolumeMount::Long(long) => long.target.as_str(),
    };

    (!path.is_empty()).then(|| Volume {
        container_path: path.to_string(),
    })
}

fn convert_logging(service: &ServiceConfig) -> Option<Logging> {
    let logging = service.logging.as_ref()?;
    let driver = logging.driver.as_ref().filter(|d| !d.is_empty())?;
    let options: BTreeMap<String, String> = logging
        .options
        .iter()
        .flatten()
        .map(|(k, v)| (k.clone(), v.to_string()))
        .collect();

    (!options.is_empty()).then(|| Logging {
        driver: driver.clone(),
        options,
    })
}

/// Container side of a port entry.
///
/// Accepts `80`, `8080:80`, `127.0.0.1:8080:80` (each optionally with a
/// `/protocol` suffix) and the long syntax. Ranges are rejected.
pub fn container_port(entry: &PortConfig) -> Result<u16> {
    match entry {
        PortConfig::Number(port) => u16::try_from(*port)
            .map_err(|_| SlopposeError::Schema(format!("invalid port {}", port))),
        PortConfig::Short(spec) => {
            reject_range(spec)?;
            let spec = spec.split('/').next().unwrap_or_default();
            let parts: Vec<&str> = spec.split(':').collect();
            let container = match parts.as_slice() {
                [port] => *port,
                [_, port] => *port,
                [_, second, rest @ ..] => match rest.first() {
                    Some(port) if port.trim().parse::<u16>().is_ok() => *port,
                    // trailing mode, e.g. "8080:80:ro"
                    _ => *second,
                },
                [] => "",
            };
            container
                .trim()
                .parse()
                .map_err(|_| SlopposeError::Schema(format!("invalid port {:?}", spec)))
        }
        PortConfig::Long(long) => {
            if let Some(published) = &long.published {
                reject_range(&published.to_string())?;
            }
            Ok(long.target)
        }
    }
}

fn reject_range(spec: &str) -> Result<()> {
    if spec.contains('-') {
        return Err(SlopposeError::UnsupportedFeature(format!(
            "port ranges are not supported: {:?}",
            spec
        )));
    }
    Ok(())
}

/// Convert a memory limit into MB, floored at [`MIN_MEMORY_MB`].
///
/// Strings need a `b`, `k`, `m` or `g` unit; plain integers are bytes.
pub fn parse_memory(value: &ScalarValue) -> Result<u64> {
    let (amount, unit) = match value {
        ScalarValue::Int(bytes) if *bytes >= 0 => (*bytes as u64, "b".to_string()),
        other => {
            let raw = other.to_string();
            let caps = MEMORY.captures(raw.trim()).ok_or_else(|| {
                SlopposeError::Schema(format!("unsupported memory format: {:?}", raw))
            })?;
            let amount = caps[1].parse::<u64>().map_err(|_| {
                SlopposeError::Schema(format!("unsupported memory format: {:?}", raw))
            })?;
            (amount, caps[2].to_lowercase())
        }
    };

    let mb = match unit.as_str() {
        "b" => amount / 1024 / 1024,
        "k" => amount / 1024,
        "m" => amount,
        "g" => amount.saturating_mul(1024),
        _ => {
            return Err(SlopposeError::Schema(format!(
                "unsupported memory unit: {:?}",
                unit
            )))
        }
    };
    Ok(mb.max(MIN_MEMORY_MB))
}
