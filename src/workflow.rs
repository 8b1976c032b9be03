use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use validator::Validate;

use crate::config::WorkflowConfig;

pub const RUN_TASK_STATE: &str = "RunTask";
pub const RUN_ECS_TASK_SYNC: &str = "arn:aws:states:::ecs:runTask.sync";
pub const TASK_FAILED: &str = "States.TaskFailed";

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("Validation errors: {0}")]
    ValidationError(String),

    #[error("Unable to render the state machine definition: {0}")]
    RenderError(String),
}

/// ECS cluster and network the scheduled task runs in.
#[derive(Debug, Clone, Validate)]
pub struct ClusterWiring {
    #[validate(length(min = 1))]
    pub cluster_arn: String,

    #[validate(length(min = 1))]
    pub subnet_ids: Vec<String>,

    #[validate(length(min = 1))]
    pub security_group_ids: Vec<String>,
}

/// Inputs of the workflow generators that do not come from the workflow file.
///
/// Without `wiring` only the schedule is generated and the cluster and
/// network parameters of the template are left as placeholders.
#[derive(Debug, Clone, Validate)]
pub struct WorkflowParams {
    #[validate(length(min = 1))]
    pub task_arn: String,

    pub wiring: Option<ClusterWiring>,
}

impl WorkflowParams {
    pub fn check(&self) -> Result<(), Error> {
        match self.validate() {
            Ok(_) => (),
            Err(error) => return Err(Error::ValidationError(error.to_string())),
        }

        if let Some(wiring) = &self.wiring {
            match wiring.validate() {
                Ok(_) => (),
                Err(error) => return Err(Error::ValidationError(error.to_string())),
            }
        }

        return Ok(());
    }
}

/// A value in a generated template: either inlined, or resolved by the
/// deployment tool from a template parameter or variable.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding<T> {
    Literal(T),
    /// CloudFormation `{"Ref": name}`.
    Parameter(String),
    /// Terraform `${var.name}`.
    Variable(String),
}

impl<T: Serialize> Serialize for Binding<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Binding::Literal(value) => value.serialize(serializer),
            Binding::Parameter(name) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Ref", name)?;
                map.end()
            }
            Binding::Variable(name) => serializer.serialize_str(&format!("${{var.{}}}", name)),
        }
    }
}

/// How each externally supplied value of the state machine is expressed.
#[derive(Debug, Clone)]
pub struct Bindings {
    pub cluster: Binding<String>,
    pub subnets: Binding<Vec<String>>,
    pub security_groups: Binding<Vec<String>>,
    pub timeout_seconds: Binding<u64>,
    pub interval_seconds: Binding<u64>,
    pub max_attempts: Binding<u32>,
    pub backoff_rate: Binding<f64>,
}

impl Bindings {
    /// Network values come from template parameters, retry and timeout
    /// values are inlined from the workflow file.
    pub fn cloudformation(config: &WorkflowConfig) -> Self {
        Self {
            cluster: Binding::Parameter(String::from("ClusterArn")),
            subnets: Binding::Parameter(String::from("SubnetIds")),
            security_groups: Binding::Parameter(String::from("SecurityGroupIds")),
            timeout_seconds: Binding::Literal(config.timeout_seconds()),
            interval_seconds: Binding::Literal(config.interval_seconds()),
            max_attempts: Binding::Literal(config.max_attempts()),
            backoff_rate: Binding::Literal(config.backoff_rate()),
        }
    }

    /// Everything is read from Terraform variables.
    pub fn terraform() -> Self {
        Self {
            cluster: Binding::Variable(String::from("ecs_cluster_arn")),
            subnets: Binding::Variable(String::from("subnet_ids")),
            security_groups: Binding::Variable(String::from("security_group_ids")),
            timeout_seconds: Binding::Variable(String::from("timeout_seconds")),
            interval_seconds: Binding::Variable(String::from("retry_interval_seconds")),
            max_attempts: Binding::Variable(String::from("retry_attempts")),
            backoff_rate: Binding::Variable(String::from("retry_backoff_rate")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StateMachineDefinition {
    pub comment: String,
    pub start_at: String,
    pub timeout_seconds: Binding<u64>,
    pub states: BTreeMap<String, TaskState>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskState {
    #[serde(rename = "Type")]
    pub kind: String,
    pub resource: String,
    pub parameters: RunTaskParameters,
    pub retry: Vec<RetryRule>,
    pub end: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RunTaskParameters {
    pub launch_type: String,
    pub cluster: Binding<String>,
    pub task_definition: String,
    pub network_configuration: NetworkConfiguration,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkConfiguration {
    pub awsvpc_configuration: AwsvpcConfiguration,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AwsvpcConfiguration {
    pub subnets: Binding<Vec<String>>,
    pub assign_public_ip: String,
    pub security_groups: Binding<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RetryRule {
    pub error_equals: Vec<String>,
    pub interval_seconds: Binding<u64>,
    pub max_attempts: Binding<u32>,
    pub backoff_rate: Binding<f64>,
}

/// Builds the single-state machine that runs `task_arn` on Fargate and
/// retries it on task failure.
pub fn state_machine_definition(
    config: &WorkflowConfig,
    task_arn: &str,
    bindings: Bindings,
) -> StateMachineDefinition {
    let run_task = TaskState {
        kind: String::from("Task"),
        resource: String::from(RUN_ECS_TASK_SYNC),
        parameters: RunTaskParameters {
            launch_type: String::from("FARGATE"),
            cluster: bindings.cluster,
            task_definition: task_arn.to_string(),
            network_configuration: NetworkConfiguration {
                awsvpc_configuration: AwsvpcConfiguration {
                    subnets: bindings.subnets,
                    assign_public_ip: String::from("ENABLED"),
                    security_groups: bindings.security_groups,
                },
            },
        },
        retry: vec![RetryRule {
            error_equals: vec![String::from(TASK_FAILED)],
            interval_seconds: bindings.interval_seconds,
            max_attempts: bindings.max_attempts,
            backoff_rate: bindings.backoff_rate,
        }],
        end: true,
    };

    StateMachineDefinition {
        comment: config.description().to_string(),
        start_at: String::from(RUN_TASK_STATE),
        timeout_seconds: bindings.timeout_seconds,
        states: BTreeMap::from([(String::from(RUN_TASK_STATE), run_task)]),
    }
}
