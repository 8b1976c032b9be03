use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::{self, WorkflowConfig, WorkloadConfig};
use crate::sam;
use crate::task_definition::{self, TaskDefinitionParams};
use crate::terraform;
use crate::workflow::{ClusterWiring, WorkflowParams};
use crate::writer;

/// `Handler` is implemented by every subcommand.
pub trait Handler {
    /// Runs the subcommand to completion.
    fn handler(&self) -> Result<()>;

    /// What the subcommand generates, used in error reports.
    fn artifact(&self) -> &'static str;
}

#[derive(Subcommand, Debug)]
pub enum Command {
    TaskDefinition(TaskDefinitionCommand),
    Workflow(WorkflowCommand),
    Schedule(ScheduleCommand),
}

/// Generate AWS deployment artifacts from simplified YAML descriptions.
#[derive(Parser, Debug)]
#[clap(version, author, about)]
pub struct CommandLineInterface {
    /// The generator to run
    #[clap(subcommand)]
    pub command: Command,
}

impl CommandLineInterface {
    pub fn command(self) -> Box<dyn Handler> {
        match self.command {
            Command::TaskDefinition(handler) => Box::new(handler),
            Command::Workflow(handler) => Box::new(handler),
            Command::Schedule(handler) => Box::new(handler),
        }
    }
}

/// Generate an ECS task definition from a workload YAML file.
#[derive(Debug, Args)]
pub struct TaskDefinitionCommand {
    /// Path to the YAML configuration file
    pub yaml_file: PathBuf,

    /// The cluster name
    pub cluster_name: String,

    /// AWS region for log configuration
    pub aws_region: String,

    /// ECR registry URL
    pub registry: String,

    /// Container image name
    pub image_name: String,

    /// Container image tag
    pub tag: String,

    /// Output file path
    #[clap(long, default_value = "task-definition.json")]
    pub output: PathBuf,
}

impl Handler for TaskDefinitionCommand {
    #[tracing::instrument(name = "TaskDefinitionCommand::handler", skip(self), fields(config = %self.yaml_file.display()))]
    fn handler(&self) -> Result<()> {
        let config: WorkloadConfig = config::load(&self.yaml_file)
            .with_context(|| format!("Error loading configuration from {}", self.yaml_file.display()))?;

        let params = TaskDefinitionParams {
            cluster_name: self.cluster_name.clone(),
            aws_region: self.aws_region.clone(),
            registry: Some(self.registry.clone()).filter(|registry| !registry.is_empty()),
            image_name: self.image_name.clone(),
            tag: Some(self.tag.clone()).filter(|tag| !tag.is_empty()),
        };
        let task_definition = task_definition::build(&config, &params)?;

        println!("Setting container image to: {}", params.image());
        println!("::set-output name=replica_count::{}", config.replica_count());

        writer::write_json(&self.output, &task_definition, "Task definition")?;

        let pretty = serde_json::to_string_pretty(&task_definition)?;
        println!("\n----- Task Definition -----");
        println!("{}", pretty);
        println!("---------------------------\n");

        info!(
            family = %task_definition.family,
            containers = task_definition.container_definitions.len(),
            "generated task definition"
        );
        Ok(())
    }

    fn artifact(&self) -> &'static str {
        "task definition"
    }
}

/// Generate the Terraform module and SAM template scheduling an ECS task
/// through a Step Function.
#[derive(Debug, Args)]
pub struct WorkflowCommand {
    /// Path to YAML configuration file
    #[clap(long)]
    pub config: PathBuf,

    /// ECS Task Definition ARN
    #[clap(long)]
    pub task_arn: String,

    /// ECS Cluster ARN
    #[clap(long)]
    pub cluster_arn: String,

    /// List of subnet IDs
    #[clap(long, num_args = 1.., required = true)]
    pub subnet_ids: Vec<String>,

    /// List of security group IDs
    #[clap(long, num_args = 1.., required = true)]
    pub security_group_ids: Vec<String>,

    /// Directory to output Terraform files
    #[clap(long, default_value = "terraform")]
    pub output_dir: PathBuf,
}

impl Handler for WorkflowCommand {
    #[tracing::instrument(name = "WorkflowCommand::handler", skip(self), fields(config = %self.config.display()))]
    fn handler(&self) -> Result<()> {
        let config: WorkflowConfig = config::load(&self.config)
            .with_context(|| format!("Error loading configuration from {}", self.config.display()))?;

        let wiring = ClusterWiring {
            cluster_arn: self.cluster_arn.clone(),
            subnet_ids: self.subnet_ids.clone(),
            security_group_ids: self.security_group_ids.clone(),
        };
        let params = WorkflowParams {
            task_arn: self.task_arn.clone(),
            wiring: Some(wiring.clone()),
        };
        params.check()?;

        let main_tf = terraform::render(&config, &params.task_arn, &wiring)?;
        writer::write_text(&self.output_dir.join("main.tf"), &main_tf, "Terraform module")?;

        let template = sam::template(&config, &params.task_arn, Some(&wiring));
        writer::write_yaml(&self.output_dir.join("template.yaml"), &template, "SAM template")?;

        info!(name = config.name(), output_dir = %self.output_dir.display(), "generated workflow");
        println!("Done! Files are ready for deployment.");
        Ok(())
    }

    fn artifact(&self) -> &'static str {
        "workflow templates"
    }
}

/// Generate a SAM template that only schedules the task; cluster and
/// network parameters are left as placeholders.
#[derive(Debug, Args)]
pub struct ScheduleCommand {
    /// Path to YAML configuration file
    #[clap(long)]
    pub config: PathBuf,

    /// ECS Task Definition ARN
    #[clap(long)]
    pub task_arn: String,
}

impl ScheduleCommand {
    /// Generates the schedule-only template into `output`.
    #[tracing::instrument(name = "ScheduleCommand::run", skip(self), fields(config = %self.config.display()))]
    pub fn run(&self, output: &Path) -> Result<()> {
        let config: WorkflowConfig = config::load(&self.config)
            .with_context(|| format!("Error loading configuration from {}", self.config.display()))?;

        let params = WorkflowParams {
            task_arn: self.task_arn.clone(),
            wiring: None,
        };
        params.check()?;

        let template = sam::template(&config, &params.task_arn, None);
        writer::write_yaml(output, &template, "SAM template")?;

        info!(name = config.name(), output = %output.display(), "generated schedule");
        Ok(())
    }
}

impl Handler for ScheduleCommand {
    fn handler(&self) -> Result<()> {
        self.run(Path::new("template.yaml"))
    }

    fn artifact(&self) -> &'static str {
        "schedule template"
    }
}
