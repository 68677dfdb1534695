//! Dependency linking between sloppy apps
//!
//! Compose files rarely declare every connection between services; most of
//! them hide in environment values such as `DB_HOST=db` or
//! `MONGO_URL=mongodb://db:27017/app`. The linker finds those with a
//! heuristic, rewrites the host to the app's fully qualified name
//! (`app.group.project`) and records a dependency. Explicit `depends_on`
//! and `links` declarations are added on top.
//!
//! The heuristic: a value is inspected when it contains a `:` or its key
//! contains `HOST`. The host is the first `[a-z0-9._-]` token after an
//! optional `scheme://` and `user@` prefix. Keys that merely contain `HOST`
//! (e.g. `GHOSTSCRIPT`) can misfire; such misses only produce a warning.

use super::file::{App, SloppyFile};
use crate::compose::config::ComposeFile;
use crate::error::{Result, SlopposeError};
use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

static CANDIDATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[a-z][a-z0-9+.-]*://)?(?:[^@/\s]*@)?([a-z0-9][a-z0-9._-]*)(?::(\d+))?")
        .expect("candidate pattern is valid")
});

/// Host token found in an environment value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate<'a> {
    /// The host as written
    pub name: &'a str,
    /// Byte range of the host inside the value
    pub span: Range<usize>,
    /// Port following the host, if any
    pub port: Option<u16>,
}

/// Extract the service host an environment variable may point at
pub fn find_service_candidate<'a>(key: &str, value: &'a str) -> Option<Candidate<'a>> {
    if !value.contains(':') && !key.contains("HOST") {
        return None;
    }

    let caps = CANDIDATE.captures(value)?;
    let host = caps.get(1)?;
    Some(Candidate {
        name: host.as_str(),
        span: host.range(),
        port: caps.get(2).and_then(|p| p.as_str().parse().ok()),
    })
}

/// Fully qualified name of an app
pub fn fqdn(app: &str, group: &str, project: &str) -> String {
    format!("{}.{}.{}", app, group, project)
}

/// Relative dependency path for an fqdn: `db.apps.p` becomes `../apps/db`
pub fn dependency_path(fqdn: &str) -> String {
    let parts: Vec<&str> = fqdn.split('.').collect();
    let mut path = String::from("..");
    for part in parts[..parts.len().saturating_sub(1)].iter().rev() {
        path.push('/');
        path.push_str(part);
    }
    path
}

/// An app that can be linked to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub group: String,
    pub app: String,
    pub fqdn: String,
    /// Container ports of the app
    pub ports: Vec<u16>,
}

/// All linkable apps of one project, ordered by fqdn
#[derive(Debug, Default)]
pub struct LinkTable {
    links: Vec<Link>,
}

impl LinkTable {
    pub fn build(file: &SloppyFile) -> Self {
        let mut links: Vec<Link> = file
            .services
            .iter()
            .flat_map(|(group, apps)| {
                apps.iter().map(move |(name, app)| Link {
                    group: group.clone(),
                    app: name.clone(),
                    fqdn: fqdn(name, group, &file.project),
                    ports: app.container_ports(),
                })
            })
            .collect();
        links.sort_by(|a, b| a.fqdn.cmp(&b.fqdn));
        Self { links }
    }

    /// Find the app a host refers to.
    ///
    /// The host has to match whole leading segments of the fqdn: `db` and
    /// `db.apps` match `db.apps.p`, `d` does not, and neither does `db`
    /// match `db2.apps.p`.
    pub fn lookup(&self, host: &str) -> Option<&Link> {
        if host.is_empty() {
            return None;
        }
        self.links.iter().find(|link| {
            link.fqdn == host
                || link
                    .fqdn
                    .strip_prefix(host)
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

/// Resolve implicit and explicit dependencies of every app in place.
///
/// Fails only when an explicitly declared dependency does not exist.
/// Running it again on its own output changes nothing.
pub fn resolve(compose: &ComposeFile, file: &mut SloppyFile) -> Result<()> {
    let table = LinkTable::build(file);
    tracing::debug!("Resolving links between {} apps", table.len());

    for (group, apps) in file.services.iter_mut() {
        for (name, app) in apps.iter_mut() {
            let own = fqdn(name, group, &file.project);
            link_environment(&table, &own, name, app);

            let Some(service) = compose.services.get(name) else {
                continue;
            };
            for dep in service.declared_dependencies() {
                let target = table.lookup(&dep).ok_or_else(|| {
                    SlopposeError::Dependency(format!(
                        "couldn't find app {:?}, declared as dependency of {:?}",
                        dep, name
                    ))
                })?;
                if target.fqdn != own {
                    app.add_dependency(dependency_path(&target.fqdn));
                }
            }
        }
    }

    file.sort_fields();
    Ok(())
}

fn link_environment(table: &LinkTable, own: &str, name: &str, app: &mut App) {
    let vars: Vec<(String, String)> = app
        .env_vars
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    for (key, value) in vars {
        let Some(candidate) = find_service_candidate(&key, &value) else {
            continue;
        };

        let Some(target) = table.lookup(candidate.name) else {
            tracing::warn!(
                "App '{}': {} points at '{}', which is not part of the project; treating it as an external service",
                name,
                key,
                candidate.name
            );
            continue;
        };

        let rewritten = format!(
            "{}{}{}",
            &value[..candidate.span.start],
            target.fqdn,
            &value[candidate.span.end..]
        );
        if rewritten != value {
            tracing::debug!("App '{}': {} {} -> {}", name, key, value, rewritten);
            app.set_env(&key, &rewritten);
        }

        if let Some(port) = candidate.port {
            if !target.ports.is_empty() && !target.ports.contains(&port) {
                tracing::debug!(
                    "App '{}': {} uses port {}, but '{}' exposes {:?}",
                    name,
                    key,
                    port,
                    target.app,
                    target.ports
                );
            }
        }

        if target.fqdn != own {
            app.add_dependency(dependency_path(&target.fqdn));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::config::ServiceConfig;
    use crate::sloppy::file::{PortMapping, DEFAULT_GROUP};

    fn app(image: &str, env: &[(&str, &str)]) -> App {
        let mut app = App {
            image: image.to_string(),
            ..Default::default()
        };
        for (k, v) in env {
            app.set_env(k, v);
        }
        app
    }

    fn project(apps: Vec<(&str, App)>) -> SloppyFile {
        let mut file = SloppyFile::new("p");
        let group = file.services.get_mut(DEFAULT_GROUP).unwrap();
        for (name, app) in apps {
            group.insert(name.to_string(), app);
        }
        file
    }

    fn compose(services: &[(&str, &str)]) -> ComposeFile {
        ComposeFile {
            project_name: "p".to_string(),
            services: services
                .iter()
                .map(|(name, yaml)| {
                    let service: ServiceConfig = serde_yaml::from_str(yaml).unwrap();
                    (name.to_string(), service)
                })
                .collect(),
        }
    }

    #[test]
    fn test_find_service_candidate() {
        let cases = [
            ("FOO", "bar", None),
            ("BAR", "foo:80", Some("foo")),
            ("SHORT", "s:80", Some("s")),
            ("FOO_BAR", "another.foo:443", Some("another.foo")),
            ("FOO_HOST", "bar", Some("bar")),
            ("FOO_URL", "mongodb://whatever:4444/db", Some("whatever")),
            ("BAR_URL", "foo://nope", Some("nope")),
            ("PG_URL", "postgres://user:secret@db:5432/app", Some("db")),
            ("NAME", "Upper:1", None),
        ];

        for (key, value, expected) in cases {
            let found = find_service_candidate(key, value).map(|c| c.name);
            assert_eq!(found, expected, "{}={}", key, value);
        }
    }

    #[test]
    fn test_candidate_span_and_port() {
        let value = "mongodb://db:27017/app";
        let candidate = find_service_candidate("MONGO_URL", value).unwrap();
        assert_eq!(&value[candidate.span.clone()], "db");
        assert_eq!(candidate.port, Some(27017));
    }

    #[test]
    fn test_dependency_path() {
        assert_eq!(dependency_path("db.apps.p"), "../apps/db");
        assert_eq!(dependency_path("a.b.c.d"), "../c/b/a");
    }

    #[test]
    fn test_lookup_matches_whole_segments() {
        let file = project(vec![("db2", app("mysql", &[])), ("db", app("mysql", &[]))]);
        let table = LinkTable::build(&file);
        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup("db").unwrap().fqdn, "db.apps.p");
        assert_eq!(table.lookup("db2").unwrap().fqdn, "db2.apps.p");
        assert_eq!(table.lookup("db.apps").unwrap().fqdn, "db.apps.p");
        assert_eq!(table.lookup("db.apps.p").unwrap().fqdn, "db.apps.p");
        assert!(table.lookup("d").is_none());
        assert!(table.lookup("").is_none());
    }

    #[test]
    fn test_implicit_link_rewrite() {
        let mut file = project(vec![
            ("db", app("mysql", &[])),
            ("web", app("nginx", &[("DB_HOST", "db:3306")])),
        ]);
        resolve(&compose(&[]), &mut file).unwrap();

        let web = file.app(DEFAULT_GROUP, "web").unwrap();
        assert_eq!(web.env_vars["DB_HOST"], "db.apps.p:3306");
        assert_eq!(web.env[0].value, "db.apps.p:3306");
        assert_eq!(web.dependencies, vec!["../apps/db"]);
        assert!(file.app(DEFAULT_GROUP, "db").unwrap().dependencies.is_empty());
    }

    #[test]
    fn test_scheme_preserved() {
        let mut file = project(vec![
            ("db", app("mongo", &[])),
            ("web", app("node", &[("MONGO_URL", "mongodb://db:27017/app")])),
        ]);
        resolve(&compose(&[]), &mut file).unwrap();

        let web = file.app(DEFAULT_GROUP, "web").unwrap();
        assert_eq!(web.env_vars["MONGO_URL"], "mongodb://db.apps.p:27017/app");
    }

    #[test]
    fn test_external_service_left_alone() {
        let mut file = project(vec![
            ("b", app("golang", &[])),
            (
                "a",
                app(
                    "hugo",
                    &[("API_AUTH", "some-external.service:80"), ("API_URL", "b:8080")],
                ),
            ),
        ]);
        resolve(&compose(&[]), &mut file).unwrap();

        let a = file.app(DEFAULT_GROUP, "a").unwrap();
        assert_eq!(a.env_vars["API_AUTH"], "some-external.service:80");
        assert_eq!(a.env_vars["API_URL"], "b.apps.p:8080");
        assert_eq!(a.dependencies, vec!["../apps/b"]);
    }

    #[test]
    fn test_explicit_dependency_missing() {
        let mut file = project(vec![("web", app("nginx", &[]))]);
        let compose = compose(&[("web", "image: nginx\ndepends_on:\n  - missing\n")]);
        let err = resolve(&compose, &mut file).unwrap_err();
        match err {
            SlopposeError::Dependency(msg) => assert!(msg.contains("missing")),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_explicit_dependencies_without_env() {
        let mut file = project(vec![
            ("cache", app("redis", &[])),
            ("db", app("mysql", &[])),
            ("web", app("nginx", &[])),
        ]);
        let compose = compose(&[(
            "web",
            "image: nginx\ndepends_on:\n  - db\nlinks:\n  - cache:redis\n",
        )]);
        resolve(&compose, &mut file).unwrap();

        let web = file.app(DEFAULT_GROUP, "web").unwrap();
        assert_eq!(web.dependencies, vec!["../apps/cache", "../apps/db"]);
    }

    #[test]
    fn test_self_reference_is_not_a_dependency() {
        let mut file = project(vec![("db", app("mysql", &[("MYSQL_HOST", "db:3306")]))]);
        resolve(&compose(&[]), &mut file).unwrap();

        let db = file.app(DEFAULT_GROUP, "db").unwrap();
        assert_eq!(db.env_vars["MYSQL_HOST"], "db.apps.p:3306");
        assert!(db.dependencies.is_empty());
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let mut db = app("mysql", &[]);
        db.port_mappings.push(PortMapping { port: 3306 });
        let mut file = project(vec![
            ("db", db),
            (
                "web",
                app(
                    "nginx",
                    &[("DB_HOST", "db:3306"), ("URL", "mysql://db/app"), ("X", "ext:1")],
                ),
            ),
        ]);
        let compose = compose(&[("web", "image: nginx\ndepends_on: [db]\n")]);

        resolve(&compose, &mut file).unwrap();
        let once = file.clone();
        resolve(&compose, &mut file).unwrap();
        assert_eq!(file, once);
        assert_eq!(
            file.app(DEFAULT_GROUP, "web").unwrap().dependencies,
            vec!["../apps/db"]
        );
    }

    #[test]
    fn test_env_and_dependencies_sorted() {
        let mut file = project(vec![
            ("alpha", app("a", &[])),
            ("zeta", app("z", &[])),
            (
                "web",
                app("nginx", &[("Z_HOST", "zeta"), ("A_HOST", "alpha")]),
            ),
        ]);
        resolve(&compose(&[]), &mut file).unwrap();

        let web = file.app(DEFAULT_GROUP, "web").unwrap();
        assert_eq!(web.dependencies, vec!["../apps/alpha", "../apps/zeta"]);
        let keys: Vec<_> = web.env.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["A_HOST", "Z_HOST"]);
    }
}
