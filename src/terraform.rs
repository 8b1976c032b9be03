use std::fmt::Write;

use crate::config::WorkflowConfig;
use crate::workflow::{self, Bindings, ClusterWiring, Error, StateMachineDefinition};

/// A `variable` block of the generated module.
struct Variable<'a> {
    name: &'a str,
    description: &'a str,
    kind: Option<&'a str>,
    /// Already rendered as an HCL expression.
    default: String,
}

/// Renders the Terraform module (`main.tf`) that schedules `task_arn`
/// through a Step Function.
pub fn render(
    config: &WorkflowConfig,
    task_arn: &str,
    wiring: &ClusterWiring,
) -> Result<String, Error> {
    let name = config.name();
    let description = config.description();

    let definition = StateMachineDefinition {
        comment: escape_template(description),
        ..workflow::state_machine_definition(config, task_arn, Bindings::terraform())
    };
    let definition = match serde_json::to_string_pretty(&definition) {
        Ok(rendered) => Ok(rendered),
        Err(error) => Err(Error::RenderError(error.to_string())),
    }?;

    let variables = [
        Variable {
            name: "name",
            description: "Name of the Step Function state machine",
            kind: None,
            default: quote(name),
        },
        Variable {
            name: "role_arn",
            description: "IAM Role ARN for the Step Function",
            kind: None,
            default: quote(config.role_arn()),
        },
        Variable {
            name: "timeout_seconds",
            description: "Timeout for the state machine execution in seconds",
            kind: None,
            default: config.timeout_seconds().to_string(),
        },
        Variable {
            name: "retry_attempts",
            description: "Maximum retry attempts for the task",
            kind: None,
            default: config.max_attempts().to_string(),
        },
        Variable {
            name: "retry_interval_seconds",
            description: "Interval between retry attempts in seconds",
            kind: None,
            default: config.interval_seconds().to_string(),
        },
        Variable {
            name: "retry_backoff_rate",
            description: "Backoff rate for retries",
            kind: None,
            default: format!("{:?}", config.backoff_rate()),
        },
        Variable {
            name: "schedule_expression",
            description: "CloudWatch Events schedule expression",
            kind: None,
            default: quote(config.schedule()),
        },
        Variable {
            name: "ecs_cluster_arn",
            description: "ECS Cluster ARN",
            kind: None,
            default: quote(&wiring.cluster_arn),
        },
        Variable {
            name: "subnet_ids",
            description: "Subnet IDs for the ECS task",
            kind: Some("list(string)"),
            default: quote_list(&wiring.subnet_ids),
        },
        Variable {
            name: "security_group_ids",
            description: "Security Group IDs for the ECS task",
            kind: Some("list(string)"),
            default: quote_list(&wiring.security_group_ids),
        },
    ];

    let mut out = String::new();
    writeln!(out, "# Generated Step Functions and CloudWatch Events for {}", single_line(name))
        .and_then(|_| writeln!(out, "# Description: {}", single_line(description)))
        .map_err(|error| Error::RenderError(error.to_string()))?;

    for variable in &variables {
        write_variable(&mut out, variable).map_err(|error| Error::RenderError(error.to_string()))?;
    }

    write_resources(&mut out, task_arn, &definition)
        .map_err(|error| Error::RenderError(error.to_string()))?;

    return Ok(out);
}

fn write_variable(out: &mut String, variable: &Variable) -> std::fmt::Result {
    writeln!(out)?;
    writeln!(out, "variable \"{}\" {{", variable.name)?;
    writeln!(out, "  description = {}", quote(variable.description))?;
    if let Some(kind) = variable.kind {
        writeln!(out, "  type        = {}", kind)?;
    }
    writeln!(out, "  default     = {}", variable.default)?;
    writeln!(out, "}}")
}

fn write_resources(out: &mut String, task_arn: &str, definition: &str) -> std::fmt::Result {
    writeln!(out)?;
    writeln!(out, "resource \"aws_ecs_task_definition\" \"this\" {{")?;
    writeln!(out, "  # Placeholder only. The scheduled task is {}", single_line(task_arn))?;
    writeln!(out, "  family = \"placeholder\"")?;
    writeln!(out, "  container_definitions = jsonencode([{{")?;
    writeln!(out, "    name  = \"placeholder\"")?;
    writeln!(out, "    image = \"placeholder\"")?;
    writeln!(out, "  }}])")?;
    writeln!(out)?;
    writeln!(out, "  requires_compatibilities = [\"FARGATE\"]")?;
    writeln!(out, "  network_mode             = \"awsvpc\"")?;
    writeln!(out, "  cpu                      = 256")?;
    writeln!(out, "  memory                   = 512")?;
    writeln!(out, "  execution_role_arn       = var.role_arn")?;
    writeln!(out, "  task_role_arn            = var.role_arn")?;
    writeln!(out, "}}")?;

    writeln!(out)?;
    writeln!(out, "resource \"aws_sfn_state_machine\" \"ecs_state_machine\" {{")?;
    writeln!(out, "  name       = var.name")?;
    writeln!(out, "  role_arn   = var.role_arn")?;
    writeln!(out, "  definition = jsonencode({})", indent(definition, "  "))?;
    writeln!(out, "}}")?;

    writeln!(out)?;
    writeln!(out, "resource \"aws_cloudwatch_event_rule\" \"schedule_rule\" {{")?;
    writeln!(out, "  name                = \"${{var.name}}-schedule-rule\"")?;
    writeln!(out, "  schedule_expression = var.schedule_expression")?;
    writeln!(out, "}}")?;

    writeln!(out)?;
    writeln!(out, "resource \"aws_cloudwatch_event_target\" \"state_machine_target\" {{")?;
    writeln!(out, "  rule     = aws_cloudwatch_event_rule.schedule_rule.name")?;
    writeln!(out, "  arn      = aws_sfn_state_machine.ecs_state_machine.arn")?;
    writeln!(out, "  role_arn = var.role_arn")?;
    writeln!(out, "}}")
}

/// Quotes `value` as an HCL string literal with template sequences escaped.
fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            '$' | '%' if chars.peek() == Some(&'{') => {
                quoted.push(c);
                quoted.push(c);
            }
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

fn quote_list(values: &[String]) -> String {
    let items: Vec<String> = values.iter().map(|value| quote(value)).collect();
    format!("[{}]", items.join(", "))
}

/// Escapes `${` and `%{` so user text inside JSON strings is not read as a
/// Terraform template directive.
fn escape_template(value: &str) -> String {
    value.replace("${", "$${").replace("%{", "%%{")
}

fn single_line(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .enumerate()
        .map(|(index, line)| {
            if index == 0 {
                line.to_string()
            } else {
                format!("{}{}", prefix, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wiring() -> ClusterWiring {
        ClusterWiring {
            cluster_arn: String::from("arn:aws:ecs:eu-west-1:123:cluster/main"),
            subnet_ids: vec![String::from("subnet-a"), String::from("subnet-b")],
            security_group_ids: vec![String::from("sg-1")],
        }
    }

    fn workflow(yaml: &str) -> WorkflowConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn renders_variables_with_config_defaults() {
        let config = workflow(
            "name: nightly\nschedule: cron(0 3 * * ? *)\nrole_arn: arn:aws:iam::123:role/sfn\nretryPolicy:\n  maxAttempts: 5\n",
        );

        let rendered = render(&config, "arn:aws:ecs:eu-west-1:123:task-definition/svc:7", &wiring()).unwrap();
        assert_eq!(true, rendered.contains("variable \"name\" {\n  description = \"Name of the Step Function state machine\"\n  default     = \"nightly\"\n}"));
        assert_eq!(true, rendered.contains("  default     = 5\n"));
        assert_eq!(true, rendered.contains("  default     = 2.0\n"));
        assert_eq!(true, rendered.contains("  default     = 3600\n"));
        assert_eq!(true, rendered.contains("  default     = \"cron(0 3 * * ? *)\"\n"));
        assert_eq!(true, rendered.contains("  type        = list(string)\n  default     = [\"subnet-a\", \"subnet-b\"]\n"));
        assert_eq!(true, rendered.contains("  default     = [\"sg-1\"]\n"));
    }

    #[test]
    fn renders_every_resource() {
        let config = workflow("name: nightly");

        let rendered = render(&config, "arn:aws:ecs:eu-west-1:123:task-definition/svc:7", &wiring()).unwrap();
        for resource in [
            "resource \"aws_ecs_task_definition\" \"this\"",
            "resource \"aws_sfn_state_machine\" \"ecs_state_machine\"",
            "resource \"aws_cloudwatch_event_rule\" \"schedule_rule\"",
            "resource \"aws_cloudwatch_event_target\" \"state_machine_target\"",
        ] {
            assert_eq!(true, rendered.contains(resource), "missing {}", resource);
        }
        assert_eq!(true, rendered.contains("\"Cluster\": \"${var.ecs_cluster_arn}\""));
        assert_eq!(true, rendered.contains("\"MaxAttempts\": \"${var.retry_attempts}\""));
        assert_eq!(true, rendered.contains("\"TaskDefinition\": \"arn:aws:ecs:eu-west-1:123:task-definition/svc:7\""));
        assert_eq!(true, rendered.contains("\"Resource\": \"arn:aws:states:::ecs:runTask.sync\""));
        assert_eq!(true, rendered.contains("name                = \"${var.name}-schedule-rule\""));
    }

    #[test]
    fn escapes_user_text() {
        let config = workflow("name: nightly\ndescription: 'uses ${HOME} and \"quotes\"'\n");

        let rendered = render(&config, "arn", &wiring()).unwrap();
        assert_eq!(true, rendered.contains("\"Comment\": \"uses $${HOME} and \\\"quotes\\\"\""));
        assert_eq!("\"a $${b} \\\"c\\\"\"", quote("a ${b} \"c\""));
        assert_eq!("\"100%\"", quote("100%"));
    }
}
