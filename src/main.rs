use clap::Parser;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

pub mod cli;
pub mod config;
pub mod image;
pub mod sam;
pub mod task_definition;
pub mod terraform;
pub mod workflow;
pub mod writer;

use crate::cli::CommandLineInterface;

fn main() {
    // stdout carries the generated summary and CI output lines, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let handler = CommandLineInterface::parse().command();
    if let Err(error) = handler.handler() {
        eprintln!("Error generating {}: {:#}", handler.artifact(), error);
        std::process::exit(1);
    }
}
