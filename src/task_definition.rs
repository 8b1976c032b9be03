use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};
use validator::Validate;

use crate::config::{self, WorkloadConfig};
use crate::image::{self, ImageRef};

pub const INIT_CONTAINER_NAME: &str = "init-container-for-secret-files";
pub const APP_CONTAINER_NAME: &str = "app";
pub const FLUENT_BIT_CONTAINER_NAME: &str = "fluent-bit";
pub const OTEL_CONTAINER_NAME: &str = "otel-collector";

const DEFAULT_OTEL_IMAGE: &str = "public.ecr.aws/aws-observability/aws-otel-collector:latest";
const SECRETS_VOLUME: &str = "shared-volume";
const SECRETS_PATH: &str = "/etc/secrets";

// Runs inside the init container at deploy time.
const FETCH_SECRET_FILES: &str = "for secret in ${SECRET_FILES//,/ }; do \
echo \"Fetching $secret...\"; \
aws secretsmanager get-secret-value --secret-id $secret --region $AWS_REGION --query SecretString --output text > /etc/secrets/$secret; \
if [ $? -eq 0 ] && [ -s /etc/secrets/$secret ]; then \
echo \"✅ Successfully saved $secret to /etc/secrets/$secret\"; \
else echo \"❌ Failed to save $secret\" >&2; exit 1; \
fi; \
done";

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("Validation errors: {0}")]
    ValidationError(String),
}

/// Deployment-side inputs that do not come from the workload file.
#[derive(Debug, Clone, Validate)]
pub struct TaskDefinitionParams {
    #[validate(length(min = 1))]
    pub cluster_name: String,

    #[validate(length(min = 1))]
    pub aws_region: String,

    pub registry: Option<String>,

    #[validate(length(min = 1))]
    pub image_name: String,

    pub tag: Option<String>,
}

impl TaskDefinitionParams {
    pub fn image(&self) -> ImageRef {
        ImageRef::new(
            self.registry.as_deref(),
            &self.image_name,
            self.tag.as_deref(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinition {
    pub container_definitions: Vec<ContainerDefinition>,
    pub cpu: String,
    pub memory: String,
    pub runtime_platform: RuntimePlatform,
    pub family: String,
    pub task_role_arn: String,
    pub execution_role_arn: String,
    pub network_mode: String,
    pub requires_compatibilities: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Volume>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerDefinition {
    pub name: String,
    pub image: String,
    pub essential: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environment: Vec<KeyValuePair>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entry_point: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secrets: Vec<Secret>,
    pub log_configuration: LogConfiguration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthCheck>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub port_mappings: Vec<PortMapping>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mount_points: Vec<MountPoint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<ContainerDependency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firelens_configuration: Option<FirelensConfiguration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValuePair {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Secret {
    pub name: String,
    pub value_from: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogDriver {
    Awslogs,
    Awsfirelens,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogConfiguration {
    pub log_driver: LogDriver,
    pub options: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheck {
    pub command: Vec<String>,
    pub interval: u32,
    pub timeout: u32,
    pub retries: u32,
    pub start_period: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortMapping {
    pub name: String,
    pub container_port: u16,
    pub host_port: u16,
    pub protocol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_protocol: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MountPoint {
    pub source_volume: String,
    pub container_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DependencyCondition {
    Start,
    Success,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerDependency {
    pub container_name: String,
    pub condition: DependencyCondition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirelensConfiguration {
    #[serde(rename = "type")]
    pub kind: String,
    pub options: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimePlatform {
    pub cpu_architecture: String,
    pub operating_system_family: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    pub name: String,
    pub host: HostVolume,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostVolume {}

/// Where the `awslogs` driver ships logs for every container of the task.
struct LogTarget<'a> {
    group: String,
    region: &'a str,
}

impl LogTarget<'_> {
    fn awslogs(&self, stream_prefix: Option<&str>) -> LogConfiguration {
        let mut options = BTreeMap::from([
            (String::from("awslogs-group"), self.group.clone()),
            (String::from("awslogs-region"), self.region.to_string()),
        ]);
        if let Some(prefix) = stream_prefix {
            options.insert(String::from("awslogs-stream-prefix"), prefix.to_string());
        }
        LogConfiguration {
            log_driver: LogDriver::Awslogs,
            options,
        }
    }
}

/// Builds the ECS task definition for `config`.
///
/// Containers are emitted in a fixed order: the secret-file init container,
/// the application, then the fluent-bit and otel sidecars, each only when
/// the workload asks for it.
pub fn build(config: &WorkloadConfig, params: &TaskDefinitionParams) -> Result<TaskDefinition, Error> {
    if let Err(error) = params.validate() {
        return Err(Error::ValidationError(error.to_string()));
    }

    let app_name = config.name();
    let logs = LogTarget {
        group: format!("/ecs/{}/{}", params.cluster_name, app_name),
        region: &params.aws_region,
    };

    let fluent_bit_image = fluent_bit_image(config, params.registry.as_deref());
    let otel_image = otel_image(config);
    debug!(
        fluent_bit = fluent_bit_image.is_some(),
        otel = otel_image.is_some(),
        secret_files = config.secret_files.len(),
        "resolved sidecars"
    );

    let mut container_definitions = Vec::new();
    if !config.secret_files.is_empty() {
        container_definitions.push(init_container(&config.secret_files, &logs));
    }
    container_definitions.push(app_container(
        config,
        params.image().uri(),
        fluent_bit_image.is_some(),
        &logs,
    ));
    if let Some(image) = fluent_bit_image {
        container_definitions.push(fluent_bit_container(app_name, image, &logs));
    }
    if let Some(image) = otel_image {
        container_definitions.push(otel_container(image, &logs));
    }

    let volumes = if config.secret_files.is_empty() {
        Vec::new()
    } else {
        vec![Volume {
            name: String::from(SECRETS_VOLUME),
            host: HostVolume::default(),
        }]
    };

    Ok(TaskDefinition {
        container_definitions,
        cpu: config.cpu(),
        memory: config.memory(),
        runtime_platform: RuntimePlatform {
            cpu_architecture: config.cpu_arch().to_string(),
            operating_system_family: String::from("LINUX"),
        },
        family: format!("{}_{}", params.cluster_name, app_name),
        task_role_arn: config.role_arn().to_string(),
        execution_role_arn: config.role_arn().to_string(),
        network_mode: String::from("awsvpc"),
        requires_compatibilities: vec![String::from("FARGATE")],
        volumes,
    })
}

fn fluent_bit_image(config: &WorkloadConfig, registry: Option<&str>) -> Option<String> {
    let collector = config.fluent_bit_collector.as_ref()?;
    match collector.image_name() {
        "" => None,
        image_name => Some(image::qualify(registry, image_name)),
    }
}

fn otel_image(config: &WorkloadConfig) -> Option<String> {
    let collector = config.otel_collector.as_ref()?;
    match collector.image_name() {
        "" => Some(String::from(DEFAULT_OTEL_IMAGE)),
        image_name => Some(image_name.to_string()),
    }
}

fn secrets_mount() -> MountPoint {
    MountPoint {
        source_volume: String::from(SECRETS_VOLUME),
        container_path: String::from(SECRETS_PATH),
    }
}

fn init_container(secret_files: &[String], logs: &LogTarget) -> ContainerDefinition {
    ContainerDefinition {
        name: String::from(INIT_CONTAINER_NAME),
        image: String::from("amazon/aws-cli"),
        essential: false,
        environment: vec![
            KeyValuePair {
                name: String::from("SECRET_FILES"),
                value: secret_files.join(","),
            },
            KeyValuePair {
                name: String::from("AWS_REGION"),
                value: logs.region.to_string(),
            },
        ],
        command: vec![String::from("-c"), String::from(FETCH_SECRET_FILES)],
        entry_point: vec![String::from("/bin/sh")],
        secrets: Vec::new(),
        log_configuration: logs.awslogs(Some("ssm-file-downloader")),
        health_check: None,
        port_mappings: Vec::new(),
        mount_points: vec![secrets_mount()],
        depends_on: Vec::new(),
        firelens_configuration: None,
    }
}

fn app_container(
    config: &WorkloadConfig,
    image: String,
    use_fluent_bit: bool,
    logs: &LogTarget,
) -> ContainerDefinition {
    let environment = config::entries("envs", &config.envs)
        .into_iter()
        .map(|(name, value)| KeyValuePair {
            name,
            value: config::scalar_to_string(value),
        })
        .collect();

    let secrets = config::entries("secrets", &config.secrets)
        .into_iter()
        .map(|(name, base_arn)| Secret {
            value_from: format!("{}:{}::", config::scalar_to_string(base_arn), name),
            name,
        })
        .collect();

    let log_configuration = if use_fluent_bit {
        LogConfiguration {
            log_driver: LogDriver::Awsfirelens,
            options: BTreeMap::new(),
        }
    } else {
        logs.awslogs(Some("/default"))
    };

    let has_secret_files = !config.secret_files.is_empty();
    let mut depends_on = Vec::new();
    if has_secret_files {
        depends_on.push(ContainerDependency {
            container_name: String::from(INIT_CONTAINER_NAME),
            condition: DependencyCondition::Success,
        });
    }
    if use_fluent_bit {
        depends_on.push(ContainerDependency {
            container_name: String::from(FLUENT_BIT_CONTAINER_NAME),
            condition: DependencyCondition::Start,
        });
    }

    ContainerDefinition {
        name: String::from(APP_CONTAINER_NAME),
        image,
        essential: true,
        environment,
        command: config.command.clone(),
        entry_point: config.entrypoint.clone(),
        secrets,
        log_configuration,
        health_check: health_check(config),
        port_mappings: port_mappings(config),
        mount_points: if has_secret_files {
            vec![secrets_mount()]
        } else {
            Vec::new()
        },
        depends_on,
        firelens_configuration: None,
    }
}

fn health_check(config: &WorkloadConfig) -> Option<HealthCheck> {
    let health_check = config.health_check.as_ref()?;
    let command = health_check.command.as_deref().filter(|command| !command.is_empty())?;

    Some(HealthCheck {
        command: vec![String::from("CMD-SHELL"), command.to_string()],
        interval: health_check.interval.unwrap_or(30),
        timeout: health_check.timeout.unwrap_or(5),
        retries: health_check.retries.unwrap_or(3),
        start_period: health_check.start_period.unwrap_or(10),
    })
}

fn http_port(name: String, port: u16) -> PortMapping {
    PortMapping {
        name,
        container_port: port,
        host_port: port,
        protocol: String::from("tcp"),
        app_protocol: Some(String::from("http")),
    }
}

fn port_mappings(config: &WorkloadConfig) -> Vec<PortMapping> {
    let mut mappings = Vec::new();
    if let Some(port) = config.port() {
        mappings.push(http_port(String::from("default"), port));
    }

    for (name, value) in config::entries("additional_ports", &config.additional_ports) {
        match config::as_port(value) {
            Some(port) => mappings.push(http_port(name, port)),
            None => warn!(name = %name, port = ?value, "skipping additional port that is not a port number"),
        }
    }
    mappings
}

fn fluent_bit_container(app_name: &str, image: String, logs: &LogTarget) -> ContainerDefinition {
    ContainerDefinition {
        name: String::from(FLUENT_BIT_CONTAINER_NAME),
        image,
        essential: false,
        environment: vec![KeyValuePair {
            name: String::from("SERVICE_NAME"),
            value: app_name.to_string(),
        }],
        command: Vec::new(),
        entry_point: Vec::new(),
        secrets: Vec::new(),
        log_configuration: logs.awslogs(Some("fluentbit")),
        health_check: None,
        port_mappings: Vec::new(),
        mount_points: Vec::new(),
        depends_on: Vec::new(),
        firelens_configuration: Some(FirelensConfiguration {
            kind: String::from("fluentbit"),
            options: BTreeMap::from([
                (String::from("config-file-type"), String::from("file")),
                (String::from("config-file-value"), String::from("/extra.conf")),
                (String::from("enable-ecs-log-metadata"), String::from("true")),
            ]),
        }),
    }
}

fn otel_container(image: String, logs: &LogTarget) -> ContainerDefinition {
    ContainerDefinition {
        name: String::from(OTEL_CONTAINER_NAME),
        image,
        essential: false,
        environment: Vec::new(),
        command: vec![String::from("--config"), String::from("env:SSM_CONFIG")],
        entry_point: Vec::new(),
        secrets: Vec::new(),
        log_configuration: logs.awslogs(None),
        health_check: None,
        port_mappings: vec![
            PortMapping {
                name: String::from("otel-collector-4317-tcp"),
                container_port: 4317,
                host_port: 4317,
                protocol: String::from("tcp"),
                app_protocol: Some(String::from("grpc")),
            },
            PortMapping {
                name: String::from("otel-collector-4318-tcp"),
                container_port: 4318,
                host_port: 4318,
                protocol: String::from("tcp"),
                app_protocol: None,
            },
        ],
        mount_points: Vec::new(),
        depends_on: Vec::new(),
        firelens_configuration: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> TaskDefinitionParams {
        TaskDefinitionParams {
            cluster_name: String::from("prod"),
            aws_region: String::from("eu-west-1"),
            registry: Some(String::from("123.dkr.ecr.eu-west-1.amazonaws.com")),
            image_name: String::from("svc"),
            tag: Some(String::from("abc123")),
        }
    }

    fn workload(yaml: &str) -> WorkloadConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn container_names(task_definition: &TaskDefinition) -> Vec<&str> {
        task_definition
            .container_definitions
            .iter()
            .map(|container| container.name.as_str())
            .collect()
    }

    fn app(task_definition: &TaskDefinition) -> &ContainerDefinition {
        task_definition
            .container_definitions
            .iter()
            .find(|container| container.name == APP_CONTAINER_NAME)
            .unwrap()
    }

    #[test]
    fn single_container_with_default_port_and_env() {
        let config = workload("name: svc\nport: 8080\nenvs:\n  - FOO: bar\n");

        let task_definition = build(&config, &params()).unwrap();
        assert_eq!(vec!["app"], container_names(&task_definition));

        let app = app(&task_definition);
        assert_eq!(1, app.port_mappings.len());
        assert_eq!("default", app.port_mappings[0].name);
        assert_eq!(8080, app.port_mappings[0].container_port);
        assert_eq!(8080, app.port_mappings[0].host_port);
        assert_eq!(Some(String::from("http")), app.port_mappings[0].app_protocol);
        assert_eq!(
            vec![KeyValuePair {
                name: String::from("FOO"),
                value: String::from("bar"),
            }],
            app.environment
        );
        assert_eq!(
            "123.dkr.ecr.eu-west-1.amazonaws.com/svc:abc123",
            app.image
        );
        assert_eq!("prod_svc", task_definition.family);
        assert_eq!("awsvpc", task_definition.network_mode);
        assert_eq!(vec![String::from("FARGATE")], task_definition.requires_compatibilities);
    }

    #[test]
    fn omitted_fields_are_absent_or_defaulted() {
        let config = workload("name: svc");

        let task_definition = build(&config, &params()).unwrap();
        assert_eq!("256", task_definition.cpu);
        assert_eq!("512", task_definition.memory);
        assert_eq!("X86_64", task_definition.runtime_platform.cpu_architecture);
        assert_eq!("", task_definition.task_role_arn);

        let document = serde_json::to_value(&task_definition).unwrap();
        assert_eq!(None, document.get("volumes"));
        let app = &document["containerDefinitions"][0];
        for field in [
            "environment",
            "secrets",
            "healthCheck",
            "portMappings",
            "mountPoints",
            "dependsOn",
            "firelensConfiguration",
        ] {
            assert_eq!(None, app.get(field), "unexpected field {}", field);
        }
        assert_eq!(
            "/ecs/prod/svc",
            app["logConfiguration"]["options"]["awslogs-group"]
        );
        assert_eq!(
            "/default",
            app["logConfiguration"]["options"]["awslogs-stream-prefix"]
        );
    }

    #[test]
    fn container_order_and_log_driver_hold_for_every_sidecar_combination() {
        for secret_files in [false, true] {
            for fluent_bit in [false, true] {
                for otel in [false, true] {
                    let mut yaml = String::from("name: svc\n");
                    if secret_files {
                        yaml.push_str("secret_files:\n  - db-cert\n  - api-key\n");
                    }
                    if fluent_bit {
                        yaml.push_str("fluent_bit_collector:\n  image_name: fluent-bit:2\n");
                    }
                    if otel {
                        yaml.push_str("otel_collector:\n  image_name: ''\n");
                    }

                    let task_definition = build(&workload(&yaml), &params()).unwrap();

                    let mut expected = Vec::new();
                    if secret_files {
                        expected.push(INIT_CONTAINER_NAME);
                    }
                    expected.push(APP_CONTAINER_NAME);
                    if fluent_bit {
                        expected.push(FLUENT_BIT_CONTAINER_NAME);
                    }
                    if otel {
                        expected.push(OTEL_CONTAINER_NAME);
                    }
                    assert_eq!(expected, container_names(&task_definition), "{}", yaml);

                    let app = app(&task_definition);
                    let expected_driver = if fluent_bit {
                        LogDriver::Awsfirelens
                    } else {
                        LogDriver::Awslogs
                    };
                    assert_eq!(expected_driver, app.log_configuration.log_driver, "{}", yaml);

                    let dependencies: Vec<(&str, DependencyCondition)> = app
                        .depends_on
                        .iter()
                        .map(|dependency| (dependency.container_name.as_str(), dependency.condition))
                        .collect();
                    let mut expected_dependencies = Vec::new();
                    if secret_files {
                        expected_dependencies.push((INIT_CONTAINER_NAME, DependencyCondition::Success));
                    }
                    if fluent_bit {
                        expected_dependencies.push((FLUENT_BIT_CONTAINER_NAME, DependencyCondition::Start));
                    }
                    assert_eq!(expected_dependencies, dependencies, "{}", yaml);

                    assert_eq!(secret_files, !task_definition.volumes.is_empty(), "{}", yaml);
                }
            }
        }
    }

    #[test]
    fn secret_files_add_init_container_and_volume() {
        let config = workload("name: svc\nsecret_files:\n  - db-cert\n  - api-key\n");

        let task_definition = build(&config, &params()).unwrap();
        let init = &task_definition.container_definitions[0];
        assert_eq!(false, init.essential);
        assert_eq!("amazon/aws-cli", init.image);
        assert_eq!(vec![String::from("/bin/sh")], init.entry_point);
        assert_eq!("-c", init.command[0]);
        assert_eq!(
            concat!(
                "for secret in ${SECRET_FILES//,/ }; do ",
                "echo \"Fetching $secret...\"; ",
                "aws secretsmanager get-secret-value --secret-id $secret --region $AWS_REGION ",
                "--query SecretString --output text > /etc/secrets/$secret; ",
                "if [ $? -eq 0 ] && [ -s /etc/secrets/$secret ]; then ",
                "echo \"✅ Successfully saved $secret to /etc/secrets/$secret\"; ",
                "else echo \"❌ Failed to save $secret\" >&2; exit 1; ",
                "fi; ",
                "done"
            ),
            init.command[1]
        );
        assert_eq!("db-cert,api-key", init.environment[0].value);
        assert_eq!("eu-west-1", init.environment[1].value);
        assert_eq!(
            Some(&String::from("ssm-file-downloader")),
            init.log_configuration.options.get("awslogs-stream-prefix")
        );

        let app = app(&task_definition);
        assert_eq!(SECRETS_PATH, app.mount_points[0].container_path);
        assert_eq!(SECRETS_VOLUME, task_definition.volumes[0].name);

        let document = serde_json::to_value(&task_definition).unwrap();
        assert_eq!(serde_json::json!({}), document["volumes"][0]["host"]);
    }

    #[test]
    fn out_of_range_main_port_is_skipped() {
        let config = workload("name: svc\nport: 70000\nadditional_ports:\n  - metrics: 9090\n");

        let task_definition = build(&config, &params()).unwrap();
        let mappings = &app(&task_definition).port_mappings;
        assert_eq!(1, mappings.len());
        assert_eq!("metrics", mappings[0].name);
        assert_eq!(9090, mappings[0].container_port);
    }

    #[test]
    fn sidecar_images() {
        let config = workload(
            "name: svc\nfluent_bit_collector:\n  image_name: '  fluent-bit:2.1 '\notel_collector:\n  image_name: otel/custom:1\n",
        );

        let task_definition = build(&config, &params()).unwrap();
        let fluent_bit = &task_definition.container_definitions[1];
        assert_eq!(
            "123.dkr.ecr.eu-west-1.amazonaws.com/fluent-bit:2.1",
            fluent_bit.image
        );
        assert_eq!("svc", fluent_bit.environment[0].value);
        assert_eq!(
            "fluentbit",
            fluent_bit.firelens_configuration.as_ref().unwrap().kind
        );

        let otel = &task_definition.container_definitions[2];
        assert_eq!("otel/custom:1", otel.image);
        assert_eq!(None, otel.log_configuration.options.get("awslogs-stream-prefix"));
        assert_eq!(None, otel.port_mappings[1].app_protocol);
    }

    #[test]
    fn blank_fluent_bit_image_disables_sidecar() {
        let config = workload("name: svc\nfluent_bit_collector:\n  image_name: '   '\notel_collector: {}\n");

        let task_definition = build(&config, &params()).unwrap();
        assert_eq!(vec!["app", "otel-collector"], container_names(&task_definition));
        assert_eq!(DEFAULT_OTEL_IMAGE, task_definition.container_definitions[1].image);
    }

    #[test]
    fn secrets_health_check_and_additional_ports() {
        let config = workload(
            r#"
name: svc
port: 8080
additional_ports:
  - metrics: 9090
  - admin: "9091"
secrets:
  - DB_PASSWORD: arn:aws:secretsmanager:eu-west-1:123:secret:db
health_check:
  command: curl -f http://localhost:8080/health
  retries: 5
"#,
        );

        let task_definition = build(&config, &params()).unwrap();
        let app = app(&task_definition);

        let ports: Vec<(&str, u16)> = app
            .port_mappings
            .iter()
            .map(|mapping| (mapping.name.as_str(), mapping.container_port))
            .collect();
        assert_eq!(vec![("default", 8080), ("metrics", 9090), ("admin", 9091)], ports);

        assert_eq!(
            Secret {
                name: String::from("DB_PASSWORD"),
                value_from: String::from("arn:aws:secretsmanager:eu-west-1:123:secret:db:DB_PASSWORD::"),
            },
            app.secrets[0]
        );

        let health_check = app.health_check.as_ref().unwrap();
        assert_eq!(
            vec![
                String::from("CMD-SHELL"),
                String::from("curl -f http://localhost:8080/health")
            ],
            health_check.command
        );
        assert_eq!(30, health_check.interval);
        assert_eq!(5, health_check.timeout);
        assert_eq!(5, health_check.retries);
        assert_eq!(10, health_check.start_period);
    }

    #[test]
    fn empty_health_check_command_is_skipped() {
        let config = workload("name: svc\nhealth_check:\n  command: ''\n  interval: 10\n");

        let task_definition = build(&config, &params()).unwrap();
        assert_eq!(None, app(&task_definition).health_check);
    }

    #[test]
    fn missing_cluster_name_is_rejected() {
        let mut params = params();
        params.cluster_name = String::new();

        let result = build(&workload("name: svc"), &params);
        match result.err().unwrap() {
            Error::ValidationError(_) => {}
        }
    }

    #[test]
    fn json_round_trip_is_lossless() {
        let config = workload(
            "name: svc\nport: 80\nsecret_files: [cert]\nfluent_bit_collector:\n  image_name: fb\notel_collector: {}\nhealth_check:\n  command: 'true'\n",
        );
        let task_definition = build(&config, &params()).unwrap();

        let serialized = serde_json::to_string_pretty(&task_definition).unwrap();
        let parsed: TaskDefinition = serde_json::from_str(&serialized).unwrap();
        assert_eq!(task_definition, parsed);
    }
}
