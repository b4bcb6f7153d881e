// src/lib.rs

pub mod cli;
pub mod config;
pub mod dynamics;
pub mod errors;
pub mod flow;
pub mod logging;
pub mod network;
pub mod propagation;
pub mod types;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::flow::{BufferSizeMargin, DataFlowDynamics, DynamicsReport, SynthesisConfig, node_label};
use crate::network::{Activity, Network, TaskKind};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - network file loading and validation
/// - margin override from the command line
/// - propagation + policy synthesis
/// - report printing
pub fn run(args: CliArgs) -> Result<()> {
    let network_path = PathBuf::from(&args.network);
    let file = load_and_validate(&network_path)
        .with_context(|| format!("loading {}", network_path.display()))?;

    // Reject a bad margin before computing anything.
    let config = match args.margin {
        Some(margin) => SynthesisConfig {
            buffer_size_margin: BufferSizeMargin::new(margin)?,
        },
        None => file.synthesis_config()?,
    };

    let network = Network::from_config(&file)?;

    if args.dry_run {
        print_dry_run(&network, &config);
        return Ok(());
    }

    info!(
        tasks = network.task_names().len(),
        links = network.connections().len(),
        margin = config.buffer_size_margin.value(),
        "computing dataflow dynamics"
    );
    let mut engine = DataFlowDynamics::new(config);
    let report = engine.compute_connection_policies(&network)?;
    print_report(&report);
    Ok(())
}

/// Print tasks and connections without computing anything.
fn print_dry_run(network: &Network, config: &SynthesisConfig) {
    println!("dataflow-dynamics dry-run");
    println!(
        "  config.buffer_size_margin = {}",
        config.buffer_size_margin.value()
    );
    println!();

    println!("tasks ({}):", network.task_names().len());
    for task in network.tasks() {
        println!("  - {}", task.name);
        match &task.activity {
            Activity::Periodic(period) => println!("      periodic: {}s", period.as_secs_f64()),
            Activity::Triggered => println!("      triggered"),
            Activity::Slave { master } => println!("      slave of: {master}"),
        }
        match &task.kind {
            TaskKind::Component => {}
            TaskKind::Driver(devices) => println!("      driver of {} device(s)", devices.len()),
            TaskKind::ComBus(devices) => println!("      bus for {} device(s)", devices.len()),
        }
        if !task.inputs.is_empty() {
            println!("      inputs: {:?}", task.inputs.keys().collect::<Vec<_>>());
        }
        if !task.outputs.is_empty() {
            println!("      outputs: {:?}", task.outputs.keys().collect::<Vec<_>>());
        }
    }

    println!();
    println!("connections ({}):", network.connections().len());
    for ((source_task, sink_task), links) in network.connections().edges() {
        for (mapping, edge) in links {
            print!(
                "  - {source_task}.{} -> {sink_task}.{}",
                mapping.source_port, mapping.sink_port
            );
            if let Some(policy) = edge.policy {
                print!(" [policy: {policy}]");
            }
            if let Some(fallback) = edge.fallback {
                print!(" [fallback: {fallback}]");
            }
            println!();
        }
    }

    debug!("dry-run complete (nothing computed)");
}

fn print_report(report: &DynamicsReport) {
    println!("dynamics ({} passes):", report.passes);
    for ports in report.dynamics.values() {
        for dynamics in ports.values() {
            println!("  {dynamics}");
        }
    }

    if !report.partial.is_empty() {
        println!();
        println!("partial dynamics:");
        for ports in report.partial.values() {
            for dynamics in ports.values() {
                println!("  {dynamics}");
            }
        }
    }

    if !report.unresolved.is_empty() {
        println!();
        println!("unresolved:");
        for (task, ports) in &report.unresolved {
            for port in ports {
                println!("  {}", node_label(&(task.clone(), port.clone())));
            }
        }
    }

    for cycle in &report.cycles {
        let nodes: Vec<String> = cycle.iter().map(node_label).collect();
        println!("  cycle: {}", nodes.join(" -> "));
    }

    println!();
    println!("policies:");
    for ((source_task, sink_task), links) in report.policies.edges() {
        for (mapping, policy) in links {
            println!(
                "  {source_task}.{} -> {sink_task}.{}: {policy}",
                mapping.source_port, mapping.sink_port
            );
        }
    }

    if !report.warnings.is_empty() {
        println!();
        println!("warnings:");
        for warning in &report.warnings {
            println!("  {warning}");
        }
    }
}
