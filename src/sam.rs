use serde::Serialize;

use crate::config::WorkflowConfig;
use crate::workflow::{self, Binding, Bindings, ClusterWiring, StateMachineDefinition};

const STATE_MACHINE_RESOURCE: &str = "StepFunction";

/// `{"Fn::GetAtt": [resource, attribute]}`
#[derive(Debug, Clone, Serialize)]
pub struct GetAtt {
    #[serde(rename = "Fn::GetAtt")]
    pub target: [String; 2],
}

impl GetAtt {
    pub fn new(resource: &str, attribute: &str) -> Self {
        Self {
            target: [resource.to_string(), attribute.to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SamTemplate {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,
    pub transform: String,
    pub description: String,
    pub parameters: Parameters,
    pub resources: Resources,
    pub outputs: Outputs,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Parameters {
    pub cluster_arn: Parameter,
    pub subnet_ids: Parameter,
    pub security_group_ids: Parameter,
    pub task_role_arn: Parameter,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Parameter {
    #[serde(rename = "Type")]
    pub kind: String,
    pub description: String,
    pub default: String,
}

impl Parameter {
    fn string(description: &str, default: &str) -> Self {
        Self {
            kind: String::from("String"),
            description: description.to_string(),
            default: default.to_string(),
        }
    }

    fn list(description: &str, default: String) -> Self {
        Self {
            kind: String::from("CommaDelimitedList"),
            description: description.to_string(),
            default,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Resources {
    #[serde(rename = "StepFunction")]
    pub state_machine: Resource<StateMachineProperties>,
    pub schedule_rule: Resource<ScheduleRuleProperties>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Resource<P> {
    #[serde(rename = "Type")]
    pub kind: String,
    pub properties: P,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StateMachineProperties {
    pub state_machine_name: String,
    pub role_arn: Binding<String>,
    pub definition: StateMachineDefinition,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScheduleRuleProperties {
    pub name: String,
    pub schedule_expression: String,
    pub targets: Vec<RuleTarget>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RuleTarget {
    pub id: String,
    pub arn: GetAtt,
    pub role_arn: Binding<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Outputs {
    pub state_machine_arn: Output,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    pub description: String,
    pub value: GetAtt,
}

/// Builds the SAM template scheduling `task_arn` through a Step Function.
///
/// Without `wiring` the cluster parameter defaults to an empty string and
/// the subnet and security group lists to a lone `,`, to be overridden at
/// deploy time.
pub fn template(config: &WorkflowConfig, task_arn: &str, wiring: Option<&ClusterWiring>) -> SamTemplate {
    let name = config.name();
    let role = || Binding::Parameter(String::from("TaskRoleArn"));

    let (cluster_arn, subnet_ids, security_group_ids) = match wiring {
        Some(wiring) => (
            wiring.cluster_arn.clone(),
            wiring.subnet_ids.join(","),
            wiring.security_group_ids.join(","),
        ),
        None => (String::new(), String::from(","), String::from(",")),
    };

    SamTemplate {
        format_version: String::from("2010-09-09"),
        transform: String::from("AWS::Serverless-2016-10-31"),
        description: config.description().to_string(),
        parameters: Parameters {
            cluster_arn: Parameter::string("ARN of the ECS cluster", &cluster_arn),
            subnet_ids: Parameter::list("List of subnet IDs for the ECS task", subnet_ids),
            security_group_ids: Parameter::list(
                "List of security group IDs for the ECS task",
                security_group_ids,
            ),
            task_role_arn: Parameter::string(
                "IAM role ARN for the ECS task execution",
                config.role_arn(),
            ),
        },
        resources: Resources {
            state_machine: Resource {
                kind: String::from("AWS::StepFunctions::StateMachine"),
                properties: StateMachineProperties {
                    state_machine_name: name.to_string(),
                    role_arn: role(),
                    definition: workflow::state_machine_definition(
                        config,
                        task_arn,
                        Bindings::cloudformation(config),
                    ),
                },
            },
            schedule_rule: Resource {
                kind: String::from("AWS::Events::Rule"),
                properties: ScheduleRuleProperties {
                    name: format!("{}-schedule-rule", name),
                    schedule_expression: config.schedule().to_string(),
                    targets: vec![RuleTarget {
                        id: String::from("StepFunctionTarget"),
                        arn: GetAtt::new(STATE_MACHINE_RESOURCE, "Arn"),
                        role_arn: role(),
                    }],
                },
            },
        },
        outputs: Outputs {
            state_machine_arn: Output {
                description: String::from("ARN of the created Step Function"),
                value: GetAtt::new(STATE_MACHINE_RESOURCE, "Arn"),
            },
        },
    }
}
