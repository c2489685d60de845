//! Service declarations.
//!
//! A [`DslService`] is one long-running unit: a container image plus run
//! arguments, and the graph edges (`depends_on`, `next`, `trigger`) that
//! place it in the execution order.

use kraken_common::error::{KrakenError, Result};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::variable::{VariableEvaluator, Variables};

/// Raw declaration shape. Strict: unknown fields are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServiceDecl {
    name: String,
    desc: String,
    image: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    envs: Vec<String>,
    #[serde(default)]
    ports: Vec<String>,
    #[serde(default)]
    vols: Vec<String>,
    #[serde(default)]
    next: Vec<String>,
    #[serde(default)]
    depends_on: Vec<String>,
    #[serde(default)]
    trigger: Vec<String>,
}

/// A validated service declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct DslService {
    /// Service name, unique within a configuration.
    pub name: String,
    /// Human-readable description.
    pub desc: String,
    /// Container image reference.
    pub image: String,
    /// Extra `docker run` arguments.
    pub args: Vec<String>,
    /// Environment variables, `KEY=VALUE`.
    pub envs: Vec<String>,
    /// Port mappings, `HOST:CONTAINER`.
    pub ports: Vec<String>,
    /// Volume mappings, `HOST:CONTAINER`.
    pub vols: Vec<String>,
    /// Services started after this one.
    pub next: Vec<String>,
    /// Services that must already be running.
    pub depends_on: Vec<String>,
    /// Tests fired when this service reaches ready state.
    pub trigger: Vec<String>,
    /// Pristine declaration snapshot; evaluation always starts from here.
    origin: Value,
}

impl DslService {
    /// Builds a service from a raw declaration map.
    ///
    /// # Errors
    ///
    /// Returns [`KrakenError::Schema`] on unknown fields, missing required
    /// fields, or ill-typed values.
    pub fn from_value(value: Value) -> Result<Self> {
        let decl = decode(&value)?;
        tracing::debug!(name = %decl.name, image = %decl.image, "service declaration accepted");
        Ok(Self::from_parts(decl, value))
    }

    /// Re-evaluates every field against a fresh variable set.
    ///
    /// Restores the origin snapshot, substitutes, and rebuilds the fields
    /// in one atomic swap; repeated evaluation never compounds.
    ///
    /// # Errors
    ///
    /// Returns [`KrakenError::Schema`] if substitution produced a tree
    /// that no longer matches the declaration shape.
    pub fn evaluate(&mut self, variables: &Variables) -> Result<()> {
        let mut data = self.origin.clone();
        VariableEvaluator::evaluate_value(&mut data, variables);
        let decl = decode(&data)?;
        *self = Self::from_parts(decl, self.origin.clone());
        Ok(())
    }

    /// The `docker run` command line for this service.
    #[must_use]
    pub fn get_command(&self) -> String {
        let mut cmd = vec!["docker".to_owned(), "run".to_owned()];
        cmd.push("--name".to_owned());
        cmd.push(self.name.clone());
        cmd.extend(self.args.iter().cloned());
        for env in &self.envs {
            cmd.push("-e".to_owned());
            cmd.push(env.clone());
        }
        for port in &self.ports {
            cmd.push("-p".to_owned());
            cmd.push(port.clone());
        }
        for vol in &self.vols {
            cmd.push("-v".to_owned());
            cmd.push(vol.clone());
        }
        cmd.push(self.image.clone());
        cmd.join(" ")
    }

    fn from_parts(decl: ServiceDecl, origin: Value) -> Self {
        Self {
            name: decl.name,
            desc: decl.desc,
            image: decl.image,
            args: decl.args,
            envs: decl.envs,
            ports: decl.ports,
            vols: decl.vols,
            next: decl.next,
            depends_on: decl.depends_on,
            trigger: decl.trigger,
            origin,
        }
    }
}

fn decode(value: &Value) -> Result<ServiceDecl> {
    let entity = value
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("service")
        .to_owned();
    serde_yaml::from_value(value.clone()).map_err(|e| KrakenError::Schema {
        entity,
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl(s: &str) -> Value {
        serde_yaml::from_str(s).expect("should parse")
    }

    #[test]
    fn minimal_service_builds() {
        let svc = DslService::from_value(decl(
            "{name: db, desc: database, image: 'postgres:15'}",
        ))
        .expect("should build");
        assert_eq!(svc.name, "db");
        assert!(svc.depends_on.is_empty());
    }

    #[test]
    fn missing_image_rejected() {
        let err = DslService::from_value(decl("{name: db, desc: database}")).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("db"), "got: {msg}");
        assert!(msg.contains("image"), "got: {msg}");
    }

    #[test]
    fn unknown_field_rejected() {
        let err = DslService::from_value(decl(
            "{name: db, desc: d, image: i, imgae: typo}",
        ))
        .unwrap_err();
        assert!(err.to_string().contains("imgae"), "got: {err}");
    }

    #[test]
    fn command_shape() {
        let svc = DslService::from_value(decl(
            r"
            name: db
            desc: database
            image: 'postgres:15'
            args: ['-d']
            envs: [POSTGRES_PASSWORD=secret]
            ports: ['5432:5432']
            vols: ['/data:/var/lib/postgresql/data']
            ",
        ))
        .expect("should build");
        let cmd = svc.get_command();
        assert_eq!(
            cmd,
            "docker run --name db -d -e POSTGRES_PASSWORD=secret \
             -p 5432:5432 -v /data:/var/lib/postgresql/data postgres:15"
        );
    }

    #[test]
    fn command_contains_required_pieces() {
        let svc = DslService::from_value(decl(
            "{name: db, desc: d, image: 'postgres:15', ports: ['5432:5432']}",
        ))
        .expect("should build");
        let cmd = svc.get_command();
        assert!(cmd.contains("--name db"), "got: {cmd}");
        assert!(cmd.contains("-p 5432:5432"), "got: {cmd}");
        assert!(cmd.ends_with("postgres:15"), "got: {cmd}");
    }

    #[test]
    fn evaluate_replaces_rather_than_compounds() {
        let origin = decl(
            "{name: db, desc: d, image: '${registry}/postgres:${tag}'}",
        );
        let v1: Variables = [
            ("registry".to_owned(), "dev.local".to_owned()),
            ("tag".to_owned(), "14".to_owned()),
        ]
        .into();
        let v2: Variables = [
            ("registry".to_owned(), "prod.local".to_owned()),
            ("tag".to_owned(), "15".to_owned()),
        ]
        .into();

        let mut twice = DslService::from_value(origin.clone()).expect("build");
        twice.evaluate(&v1).expect("first evaluation");
        twice.evaluate(&v2).expect("second evaluation");

        let mut once = DslService::from_value(origin).expect("build");
        once.evaluate(&v2).expect("single evaluation");

        assert_eq!(twice, once);
        assert_eq!(twice.image, "prod.local/postgres:15");
    }

    #[test]
    fn evaluate_leaves_unbound_references_verbatim() {
        let mut svc = DslService::from_value(decl(
            "{name: db, desc: d, image: '${registry}/pg'}",
        ))
        .expect("build");
        svc.evaluate(&Variables::new()).expect("evaluate");
        assert_eq!(svc.image, "${registry}/pg");
    }
}
