//! Per-mode command builders for tests.
//!
//! A [`Runner`] is the executable-command abstraction for one test mode: a
//! tagged variant carrying the fields that mode needs, plus the origin
//! snapshot that makes [`Runner::evaluate`] idempotent. Command strings are
//! materialized lazily by [`Runner::get_command`]; a declaration may be
//! legally incomplete until it has been evaluated, so missing fields are a
//! command-build failure, not a construction failure.

use kraken_common::error::{KrakenError, Result};
use kraken_common::types::{HttpMethod, TestMode};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::variable::{VariableEvaluator, Variables};

/// Configuration of a plain shell command test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShellRunner {
    /// Command tokens, joined with single spaces.
    pub cmd: Vec<String>,
}

/// Configuration of an HTTP request test, materialized as a `curl` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpRunner {
    /// Request header passed to `curl -H`. Mandatory; an empty string
    /// omits the `-H` flag.
    #[serde(default)]
    pub header: Option<String>,
    /// HTTP method passed to `curl -X`.
    #[serde(default)]
    pub method: HttpMethod,
    /// Request body passed to `curl -d` for payload-bearing methods.
    #[serde(default)]
    pub payload: Option<String>,
    /// Request URL. Mandatory.
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// Configuration of a gRPC call test, materialized as a `grpcurl` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GrpcRunner {
    /// Optional proto file passed to `grpcurl -proto`.
    #[serde(default)]
    pub proto: Option<String>,
    /// Fully-qualified method to invoke. Mandatory.
    #[serde(default)]
    pub function: Option<String>,
    /// Plaintext endpoint `host:port`. Mandatory.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Request body passed to `grpcurl -d`. Mandatory.
    #[serde(default)]
    pub payload: Option<String>,
}

/// Configuration of a pytest invocation test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PytestRunner {
    /// Optional `--rootdir` value.
    #[serde(default)]
    pub root_dir: Option<String>,
    /// Arguments appended verbatim. Mandatory.
    #[serde(default)]
    pub test_args: Option<Vec<String>>,
}

/// Configuration of a `docker exec` test against a running container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DockerRunner {
    /// Name of the container to exec into. Mandatory.
    #[serde(default)]
    pub cntr_name: Option<String>,
    /// Command tokens to run inside the container. Mandatory.
    #[serde(default)]
    pub cmd: Option<Vec<String>>,
}

/// The tagged union of all runner configurations, keyed by [`TestMode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerVariant {
    /// Shell command runner.
    Shell(ShellRunner),
    /// HTTP request runner.
    Http(HttpRunner),
    /// gRPC call runner.
    Grpc(GrpcRunner),
    /// Pytest runner.
    Pytest(PytestRunner),
    /// Docker exec runner.
    Docker(DockerRunner),
}

impl RunnerVariant {
    /// The mode this variant belongs to.
    #[must_use]
    pub const fn mode(&self) -> TestMode {
        match self {
            Self::Shell(_) => TestMode::Shell,
            Self::Http(_) => TestMode::Http,
            Self::Grpc(_) => TestMode::Grpc,
            Self::Pytest(_) => TestMode::Pytest,
            Self::Docker(_) => TestMode::Docker,
        }
    }
}

/// A validated runner: the variant plus the pristine declaration snapshot
/// that evaluation is always recomputed from.
#[derive(Debug, Clone, PartialEq)]
pub struct Runner {
    origin: Value,
    variant: RunnerVariant,
}

impl Runner {
    /// Creates a runner from an untyped configuration map, selecting the
    /// variant by `mode`.
    ///
    /// # Errors
    ///
    /// Returns [`KrakenError::Schema`] if the map does not match the
    /// variant's field set (unknown or ill-typed fields are rejected).
    pub fn from_config(mode: TestMode, config: Value) -> Result<Self> {
        let variant = decode_variant(mode, config.clone())?;
        Ok(Self {
            origin: config,
            variant,
        })
    }

    /// Wraps an already-typed variant, snapshotting its serialized form as
    /// the origin.
    ///
    /// # Errors
    ///
    /// Returns [`KrakenError::Schema`] if the variant cannot be serialized
    /// back into a declaration tree.
    pub fn from_variant(variant: RunnerVariant) -> Result<Self> {
        let origin = match &variant {
            RunnerVariant::Shell(c) => serde_yaml::to_value(c),
            RunnerVariant::Http(c) => serde_yaml::to_value(c),
            RunnerVariant::Grpc(c) => serde_yaml::to_value(c),
            RunnerVariant::Pytest(c) => serde_yaml::to_value(c),
            RunnerVariant::Docker(c) => serde_yaml::to_value(c),
        }
        .map_err(|e| KrakenError::Schema {
            entity: format!("{} runner", variant.mode()),
            message: e.to_string(),
        })?;
        Ok(Self { origin, variant })
    }

    /// The mode this runner serves.
    #[must_use]
    pub const fn mode(&self) -> TestMode {
        self.variant.mode()
    }

    /// Canonical variant name for diagnostics.
    #[must_use]
    pub const fn variant_name(&self) -> &'static str {
        self.mode().runner_variant_name()
    }

    /// Read access to the typed variant.
    #[must_use]
    pub const fn variant(&self) -> &RunnerVariant {
        &self.variant
    }

    /// The pristine declaration snapshot this runner was built from.
    pub(crate) const fn origin(&self) -> &Value {
        &self.origin
    }

    /// Re-evaluates the runner's fields against a fresh variable set.
    ///
    /// Always recomputed from the origin snapshot: evaluating with set B
    /// after set A replaces A's effects instead of compounding them. The
    /// visible variant is swapped atomically; the origin is untouched.
    ///
    /// # Errors
    ///
    /// Returns [`KrakenError::Schema`] if the evaluated tree no longer
    /// matches the variant's field set.
    pub fn evaluate(&mut self, variables: &Variables) -> Result<()> {
        let mut data = self.origin.clone();
        VariableEvaluator::evaluate_value(&mut data, variables);
        self.variant = decode_variant(self.mode(), data)?;
        Ok(())
    }

    /// Materializes the executable command string for this runner.
    ///
    /// # Errors
    ///
    /// Returns [`KrakenError::CommandBuild`] naming the missing field when
    /// a mandatory field is still absent.
    pub fn get_command(&self) -> Result<String> {
        match &self.variant {
            RunnerVariant::Shell(c) => Ok(c.cmd.join(" ")),
            RunnerVariant::Http(c) => build_http_command(c),
            RunnerVariant::Grpc(c) => build_grpc_command(c),
            RunnerVariant::Pytest(c) => build_pytest_command(c),
            RunnerVariant::Docker(c) => build_docker_command(c),
        }
    }
}

fn decode_variant(mode: TestMode, config: Value) -> Result<RunnerVariant> {
    let schema_err = |e: serde_yaml::Error| KrakenError::Schema {
        entity: format!("{mode} runner"),
        message: e.to_string(),
    };
    match mode {
        TestMode::Shell => serde_yaml::from_value(config)
            .map(RunnerVariant::Shell)
            .map_err(schema_err),
        TestMode::Http => serde_yaml::from_value(config)
            .map(RunnerVariant::Http)
            .map_err(schema_err),
        TestMode::Grpc => serde_yaml::from_value(config)
            .map(RunnerVariant::Grpc)
            .map_err(schema_err),
        TestMode::Pytest => serde_yaml::from_value(config)
            .map(RunnerVariant::Pytest)
            .map_err(schema_err),
        TestMode::Docker => serde_yaml::from_value(config)
            .map(RunnerVariant::Docker)
            .map_err(schema_err),
    }
}

fn missing(runner: &'static str, field: &str) -> KrakenError {
    KrakenError::CommandBuild {
        runner,
        message: format!("required field \"{field}\" is missing"),
    }
}

fn build_http_command(c: &HttpRunner) -> Result<String> {
    let endpoint = c.endpoint.as_deref().ok_or_else(|| missing("http", "endpoint"))?;
    let header = c.header.as_deref().ok_or_else(|| missing("http", "header"))?;

    let mut cmd = vec!["curl".to_owned()];
    if !header.is_empty() {
        cmd.push("-H".to_owned());
        cmd.push(format!("'{header}'"));
    }
    cmd.push("-X".to_owned());
    cmd.push(c.method.to_string());
    if let Some(payload) = c.payload.as_deref() {
        if c.method.takes_payload() {
            cmd.push("-d".to_owned());
            cmd.push(format!("'{payload}'"));
        }
    }
    cmd.push(format!("'{endpoint}'"));
    Ok(cmd.join(" "))
}

fn build_grpc_command(c: &GrpcRunner) -> Result<String> {
    let function = c.function.as_deref().ok_or_else(|| missing("grpc", "function"))?;
    let endpoint = c.endpoint.as_deref().ok_or_else(|| missing("grpc", "endpoint"))?;
    let payload = c.payload.as_deref().ok_or_else(|| missing("grpc", "payload"))?;

    let mut cmd = vec!["grpcurl".to_owned()];
    if let Some(proto) = c.proto.as_deref() {
        cmd.push("-proto".to_owned());
        cmd.push(proto.to_owned());
    }
    cmd.push("-d".to_owned());
    cmd.push(format!("'{payload}'"));
    cmd.push("-plaintext".to_owned());
    cmd.push(endpoint.to_owned());
    cmd.push(function.to_owned());
    Ok(cmd.join(" "))
}

fn build_pytest_command(c: &PytestRunner) -> Result<String> {
    let test_args = c
        .test_args
        .as_deref()
        .ok_or_else(|| missing("pytest", "test_args"))?;

    let mut cmd = vec!["pytest".to_owned()];
    if let Some(root_dir) = c.root_dir.as_deref() {
        cmd.push("--rootdir".to_owned());
        cmd.push(root_dir.to_owned());
    }
    cmd.extend(test_args.iter().cloned());
    Ok(cmd.join(" "))
}

fn build_docker_command(c: &DockerRunner) -> Result<String> {
    let cntr_name = c
        .cntr_name
        .as_deref()
        .ok_or_else(|| missing("docker", "cntr_name"))?;
    let cmd = c.cmd.as_deref().ok_or_else(|| missing("docker", "cmd"))?;
    Ok(format!("docker exec {cntr_name} {}", cmd.join(" ")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).expect("should parse")
    }

    #[test]
    fn shell_command_joins_tokens() {
        let runner =
            Runner::from_config(TestMode::Shell, yaml("cmd: [echo, hi]")).expect("should build");
        assert_eq!(runner.get_command().expect("should render"), "echo hi");
    }

    #[test]
    fn http_get_has_no_payload_flag() {
        let runner = Runner::from_config(
            TestMode::Http,
            yaml(
                r"
                header: 'Accept: json'
                method: GET
                endpoint: http://x/y
                ",
            ),
        )
        .expect("should build");
        assert_eq!(
            runner.get_command().expect("should render"),
            "curl -H 'Accept: json' -X GET 'http://x/y'"
        );
    }

    #[test]
    fn http_post_includes_payload() {
        let runner = Runner::from_config(
            TestMode::Http,
            yaml(
                r#"
                header: 'Content-Type: application/json'
                method: POST
                payload: '{"k":1}'
                endpoint: http://x/y
                "#,
            ),
        )
        .expect("should build");
        assert_eq!(
            runner.get_command().expect("should render"),
            r#"curl -H 'Content-Type: application/json' -X POST -d '{"k":1}' 'http://x/y'"#
        );
    }

    #[test]
    fn http_delete_drops_declared_payload() {
        let runner = Runner::from_config(
            TestMode::Http,
            yaml("{header: '', method: DELETE, payload: body, endpoint: 'http://x'}"),
        )
        .expect("should build");
        assert_eq!(
            runner.get_command().expect("should render"),
            "curl -X DELETE 'http://x'"
        );
    }

    #[test]
    fn http_missing_endpoint_fails_at_command_time() {
        let runner = Runner::from_config(TestMode::Http, yaml("header: 'Accept: json'"))
            .expect("construction is legal while incomplete");
        let err = runner.get_command().unwrap_err();
        assert!(err.to_string().contains("endpoint"), "got: {err}");
    }

    #[test]
    fn grpc_command_shape() {
        let runner = Runner::from_config(
            TestMode::Grpc,
            yaml(
                r"
                proto: api.proto
                function: pkg.Svc/Echo
                endpoint: localhost:50051
                payload: '{}'
                ",
            ),
        )
        .expect("should build");
        assert_eq!(
            runner.get_command().expect("should render"),
            "grpcurl -proto api.proto -d '{}' -plaintext localhost:50051 pkg.Svc/Echo"
        );
    }

    #[test]
    fn grpc_missing_function_fails() {
        let runner = Runner::from_config(
            TestMode::Grpc,
            yaml("{endpoint: 'localhost:50051', payload: '{}'}"),
        )
        .expect("should build");
        let err = runner.get_command().unwrap_err();
        assert!(err.to_string().contains("function"), "got: {err}");
    }

    #[test]
    fn pytest_command_with_rootdir() {
        let runner = Runner::from_config(
            TestMode::Pytest,
            yaml("{root_dir: /srv/tests, test_args: [-k, smoke, -v]}"),
        )
        .expect("should build");
        assert_eq!(
            runner.get_command().expect("should render"),
            "pytest --rootdir /srv/tests -k smoke -v"
        );
    }

    #[test]
    fn pytest_missing_args_fails() {
        let runner =
            Runner::from_config(TestMode::Pytest, yaml("root_dir: /srv")).expect("should build");
        assert!(runner.get_command().is_err());
    }

    #[test]
    fn docker_command_shape() {
        let runner = Runner::from_config(
            TestMode::Docker,
            yaml("{cntr_name: web, cmd: [ls, -la]}"),
        )
        .expect("should build");
        assert_eq!(
            runner.get_command().expect("should render"),
            "docker exec web ls -la"
        );
    }

    #[test]
    fn docker_missing_container_fails() {
        let runner =
            Runner::from_config(TestMode::Docker, yaml("cmd: [ls]")).expect("should build");
        let err = runner.get_command().unwrap_err();
        assert!(err.to_string().contains("cntr_name"), "got: {err}");
    }

    #[test]
    fn unknown_field_rejected() {
        let err = Runner::from_config(TestMode::Shell, yaml("{cmd: [ls], shell: bash}"))
            .unwrap_err();
        assert!(err.to_string().contains("shell"), "got: {err}");
    }

    #[test]
    fn typed_variant_construction_snapshots_origin() {
        let mut runner = Runner::from_variant(RunnerVariant::Shell(ShellRunner {
            cmd: vec!["echo".to_owned(), "${stage}".to_owned()],
        }))
        .expect("should build");
        assert_eq!(runner.mode(), TestMode::Shell);

        let vars: Variables = [("stage".to_owned(), "dev".to_owned())].into();
        runner.evaluate(&vars).expect("should evaluate");
        assert_eq!(runner.get_command().expect("should render"), "echo dev");
    }

    #[test]
    fn evaluate_substitutes_from_origin() {
        let mut runner = Runner::from_config(
            TestMode::Docker,
            yaml("{cntr_name: '${svc}', cmd: [ping, '${svc}']}"),
        )
        .expect("should build");

        let vars: Variables = [("svc".to_owned(), "db".to_owned())].into();
        runner.evaluate(&vars).expect("should evaluate");
        assert_eq!(
            runner.get_command().expect("should render"),
            "docker exec db ping db"
        );
    }

    #[test]
    fn evaluate_is_idempotent_across_variable_sets() {
        let config = yaml("cmd: [echo, '${stage}']");
        let mut twice = Runner::from_config(TestMode::Shell, config.clone()).expect("build");
        let v1: Variables = [("stage".to_owned(), "dev".to_owned())].into();
        let v2: Variables = [("stage".to_owned(), "prod".to_owned())].into();
        twice.evaluate(&v1).expect("first evaluation");
        twice.evaluate(&v2).expect("second evaluation");

        let mut once = Runner::from_config(TestMode::Shell, config).expect("build");
        once.evaluate(&v2).expect("single evaluation");

        assert_eq!(twice, once);
    }
}
