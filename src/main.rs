use std::fs::File;
use std::sync::Mutex;

use anyhow::Context;
use clap::{Parser, Subcommand};
use harness_lib::config::{CommonArgs, Effective};
use harness_lib::domain::topic::PlanEntry;
use harness_lib::usecase::harness_usecase::HarnessUsecase;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "broker-harness", about = "Produce and drain synthetic records against a Kafka broker")]
struct Cli {
    #[command(flatten)]
    args: CommonArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Publish synthetic records to one topic
    Produce {
        #[arg(long)]
        topic: String,
        #[arg(long, default_value_t = 1)]
        count: usize,
    },
    /// Read exactly COUNT records from one or more topics
    Consume {
        #[arg(long = "topic", required = true)]
        topics: Vec<String>,
        #[arg(long, default_value_t = 1)]
        count: usize,
    },
    /// Produce each plan entry, then read every topic back
    Demo {
        /// topic:count pairs; defaults to the configured plan
        #[arg(long = "step")]
        steps: Vec<PlanEntry>,
        /// Seconds to wait between producing and consuming
        #[arg(long)]
        settle_secs: Option<u64>,
    },
    /// List topics available on the broker
    Topics,
}

fn init_tracing(log_file: Option<&str>) -> anyhow::Result<()> {
    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("cannot create log file {path}"))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(fmt::layer())
        .with(file_layer)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let eff = Effective::new(&cli.args)?;
    init_tracing(eff.log_file.as_deref())?;

    let harness = HarnessUsecase::from_effective(&eff);

    match cli.command {
        Command::Produce { topic, count } => {
            let run = harness.produce(&topic, count).await?;
            for reason in &run.report.errors {
                eprintln!("Error: {reason}");
            }
            println!(
                "{}: {} acknowledged, {} failed in {:.3}s",
                run.topic,
                run.report.acknowledged,
                run.report.errors.len(),
                run.elapsed.as_secs_f64()
            );
        }
        Command::Consume { topics, count } => {
            let run = harness.consume(&topics, count).await?;
            for record in run.records() {
                println!("{}", serde_json::to_string(&record)?);
            }
            println!(
                "{}: {} consumed in {:.3}s",
                run.topics.join(","),
                run.payloads.len(),
                run.elapsed.as_secs_f64()
            );
        }
        Command::Demo { steps, settle_secs } => {
            let plan = if steps.is_empty() { eff.plan.clone() } else { steps };
            let settle = settle_secs
                .map(std::time::Duration::from_secs)
                .unwrap_or(eff.settle);
            let summaries = harness.demo(&plan, settle).await?;
            for s in &summaries {
                println!(
                    "{}: produced {}/{} in {:.3}s, consumed {} ({} decodable) in {:.3}s",
                    s.topic,
                    s.produced.report.acknowledged,
                    s.produced.report.resolved(),
                    s.produced.elapsed.as_secs_f64(),
                    s.consumed.payloads.len(),
                    s.consumed.records().len(),
                    s.consumed.elapsed.as_secs_f64()
                );
            }
        }
        Command::Topics => {
            println!("Available topics to consume:");
            for topic in harness.list_topics()? {
                println!("  {} ({} partitions)", topic.name, topic.partitions);
            }
        }
    }

    Ok(())
}
