//! Agentgraph CLI - inspect the agent knowledge graph and recommend agents

use std::collections::BTreeMap;
use std::path::PathBuf;

use agentgraph_core::config::Config;
use agentgraph_core::domain::graph::{AgentStatus, TaskComplexity};
use agentgraph_core::ingest::{AgentManifest, GraphIngestor, IngestReport};
use agentgraph_core::selection::{AgentSummary, SelectionResult, TaskDescriptor};
use agentgraph_core::service::{AgentGraphService, RecommendRequest};
use agentgraph_core::storage::Database;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::debug;

#[derive(Parser)]
#[command(name = "agentgraph")]
#[command(author, version, about = "Agent knowledge graph and graph-based agent selection", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Database file (overrides the configured location)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the built-in agent roster
    Seed,

    /// Load agents and capabilities from a TOML or JSON manifest
    Ingest {
        /// Manifest file
        file: PathBuf,
    },

    /// Recommend agents for a task
    Recommend {
        #[command(flatten)]
        task: TaskArgs,
        /// Selection strategy (greedy, optimal_sequence, collaborative, load_balanced, adaptive)
        #[arg(short, long)]
        strategy: Option<String>,
        /// Maximum number of agents to select
        #[arg(short, long)]
        max_agents: Option<usize>,
        /// Minimum confidence an agent needs to qualify
        #[arg(long)]
        min_confidence: Option<f64>,
    },

    /// Suggest a selection strategy for a task
    SuggestStrategy {
        #[command(flatten)]
        task: TaskArgs,
    },

    /// List an agent's collaborators
    Collaborators {
        /// Agent id or name
        agent: String,
    },

    /// List the agents an agent depends on
    Dependencies {
        /// Agent id or name
        agent: String,
    },

    /// List agents holding a capability
    ByCapability { capability: String },

    /// Order the agents for a set of capabilities by their dependencies
    Sequence {
        #[arg(required = true, num_args = 1..)]
        capabilities: Vec<String>,
    },

    /// Find a path between two nodes
    Path {
        /// Source node id or name
        source: String,
        /// Target node id or name
        target: String,
        /// Maximum hops (defaults to graph.default_path_depth)
        #[arg(long)]
        max_depth: Option<usize>,
    },

    /// Merge performance metrics into an agent
    UpdatePerformance {
        /// Agent id or name
        agent: String,
        /// Metric as name=value, repeatable
        #[arg(short, long = "metric", value_parser = parse_metric, required = true)]
        metrics: Vec<(String, f64)>,
    },

    /// Record an agent's current load
    SetLoad {
        /// Agent id or name
        agent: String,
        /// Tasks currently assigned
        current_tasks: u32,
        /// New status (idle, busy, error, disabled)
        #[arg(long, value_parser = parse_status)]
        status: Option<AgentStatus>,
    },

    /// Show graph statistics
    Stats,

    /// Export the graph to a JSON file
    Export { path: PathBuf },

    /// Replace the graph with a JSON export
    Import { path: PathBuf },

    /// Remove every node and relationship
    Reset {
        #[arg(long)]
        force: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args)]
struct TaskArgs {
    /// Task type (feature, bug_fix, refactor, ...)
    task_type: String,
    /// Free-text description, scanned for capability keywords
    #[arg(short, long, default_value = "")]
    description: String,
    /// Required capabilities, comma separated
    #[arg(short, long, value_delimiter = ',')]
    capabilities: Vec<String>,
    /// simple, medium, complex or expert
    #[arg(long, value_parser = parse_complexity, default_value = "medium")]
    complexity: TaskComplexity,
    /// Task priority, 0-10
    #[arg(short, long)]
    priority: Option<i32>,
}

impl TaskArgs {
    fn into_descriptor(self) -> TaskDescriptor {
        let task = TaskDescriptor::new(self.task_type)
            .with_description(self.description)
            .with_complexity(self.complexity)
            .with_capabilities(self.capabilities);
        match self.priority {
            Some(priority) => task.with_priority(priority),
            None => task,
        }
    }
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show all configuration values
    Show,
    /// Show config file path
    Path,
    /// Write a default configuration file
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
}

fn parse_metric(s: &str) -> Result<(String, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", s))?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", value))?;
    Ok((name.trim().to_string(), value))
}

fn parse_status(s: &str) -> Result<AgentStatus, String> {
    AgentStatus::parse(s).ok_or_else(|| format!("unknown status '{}'", s))
}

fn parse_complexity(s: &str) -> Result<TaskComplexity, String> {
    TaskComplexity::parse(s).ok_or_else(|| format!("unknown complexity '{}'", s))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    // Logs go to stderr so JSON output stays parseable
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("agentgraph=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let out = Output {
        format: cli.format,
        quiet: cli.quiet,
    };

    if let Commands::Config { action } = cli.command {
        return cmd_config(action, out);
    }

    let config = Config::load()?;
    let db_path = match cli.database {
        Some(path) => path,
        None => config.database_path()?,
    };
    debug!(path = %db_path.display(), "Opening graph database");
    let db = Database::open(Some(&db_path)).await?;
    let service = AgentGraphService::open(db.pool().clone(), config.selection.clone()).await?;

    let result = run(&service, &config, cli.command, out).await;
    db.close().await;
    result
}

async fn run(
    service: &AgentGraphService,
    config: &Config,
    command: Commands,
    out: Output,
) -> anyhow::Result<()> {
    match command {
        Commands::Seed => {
            let manifest = AgentManifest::builtin()?;
            cmd_ingest(service, &manifest, out).await
        }

        Commands::Ingest { file } => {
            let manifest = AgentManifest::load(&file).await?;
            cmd_ingest(service, &manifest, out).await
        }

        Commands::Recommend {
            task,
            strategy,
            max_agents,
            min_confidence,
        } => {
            let request = RecommendRequest {
                task: task.into_descriptor(),
                strategy,
                max_agents,
                min_confidence,
            };
            let result = service.recommend(request).await?;
            out.emit(&result, || print_selection(&result))
        }

        Commands::SuggestStrategy { task } => {
            let strategy = service.recommend_strategy(&task.into_descriptor());
            out.emit(&serde_json::json!({ "strategy": strategy }), || {
                println!("{}", strategy)
            })
        }

        Commands::Collaborators { agent } => {
            let agents = service.get_collaborators(&agent).await?;
            out.emit(&agents, || print_agents(&agents, "No collaborators."))
        }

        Commands::Dependencies { agent } => {
            let agents = service.get_dependencies(&agent).await?;
            out.emit(&agents, || print_agents(&agents, "No dependencies."))
        }

        Commands::ByCapability { capability } => {
            let agents = service.get_agents_by_capability(&capability).await;
            out.emit(&agents, || {
                print_agents(&agents, &format!("No agent offers '{}'.", capability))
            })
        }

        Commands::Sequence { capabilities } => {
            let agents = service.get_optimal_sequence(&capabilities).await;
            out.emit(&agents, || {
                if agents.is_empty() {
                    println!("No agents cover those capabilities.");
                }
                for (i, agent) in agents.iter().enumerate() {
                    println!("  {}. {} ({})", i + 1, agent.name, agent.agent_type);
                }
            })
        }

        Commands::Path {
            source,
            target,
            max_depth,
        } => {
            let depth = max_depth.unwrap_or(config.graph.default_path_depth);
            let path = service.find_path(&source, &target, depth).await?;
            let names = match &path {
                Some(path) => node_names(service, &path.nodes).await,
                None => Vec::new(),
            };
            out.emit(&path, || match &path {
                Some(path) => {
                    println!("{}", names.join(" -> "));
                    println!("  Hops: {}", path.len());
                    println!("  Strength: {:.3}", path.total_strength);
                }
                None => println!("No path within {} hops.", depth),
            })
        }

        Commands::UpdatePerformance { agent, metrics } => {
            let metrics: BTreeMap<String, f64> = metrics.into_iter().collect();
            let node = service.update_performance(&agent, &metrics).await?;
            out.emit(&node, || {
                println!("Updated {}:", node.name);
                if let Some(profile) = node.as_agent() {
                    for (name, value) in &profile.performance_metrics {
                        println!("  {}: {}", name, value);
                    }
                }
            })
        }

        Commands::SetLoad {
            agent,
            current_tasks,
            status,
        } => {
            let node = service.update_load(&agent, current_tasks, status).await?;
            out.emit(&node, || {
                if let Some(profile) = node.as_agent() {
                    println!(
                        "{}: {}/{} tasks, {}",
                        node.name,
                        profile.current_tasks,
                        profile.max_concurrent_tasks,
                        profile.status
                    );
                }
            })
        }

        Commands::Stats => {
            let stats = service.get_statistics().await;
            out.emit(&stats, || {
                println!("Nodes: {}", stats.total_nodes);
                for (kind, count) in &stats.nodes_by_kind {
                    println!("  {}: {}", kind, count);
                }
                println!("Relationships: {}", stats.total_relationships);
                for (kind, count) in &stats.relationships_by_type {
                    println!("  {}: {}", kind, count);
                }
            })
        }

        Commands::Export { path } => {
            let snapshot = service.export_json(&path).await?;
            out.emit(&snapshot.statistics, || {
                println!(
                    "Exported {} nodes and {} relationships to {}",
                    snapshot.nodes.len(),
                    snapshot.relationships.len(),
                    path.display()
                )
            })
        }

        Commands::Import { path } => {
            let snapshot = service.import_json(&path).await?;
            out.emit(&snapshot.statistics, || {
                println!(
                    "Imported {} nodes and {} relationships from {}",
                    snapshot.nodes.len(),
                    snapshot.relationships.len(),
                    path.display()
                )
            })
        }

        Commands::Reset { force } => {
            if !force {
                anyhow::bail!("Refusing to delete the graph without --force");
            }
            service.reset().await?;
            out.emit(&serde_json::json!({ "reset": true }), || {
                println!("Graph reset.")
            })
        }

        Commands::Config { action } => cmd_config(action, out),
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

async fn cmd_ingest(
    service: &AgentGraphService,
    manifest: &AgentManifest,
    out: Output,
) -> anyhow::Result<()> {
    let report = GraphIngestor::new(service.graph().clone())
        .ingest(manifest)
        .await?;
    out.emit(&report, || print_report(&report))
}

fn cmd_config(action: ConfigAction, out: Output) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let config = Config::load()?;
            let items = config.list()?;
            out.emit(&config, || {
                for (key, value) in &items {
                    println!("{} = {}", key, value);
                }
            })
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            out.emit(&serde_json::json!({ "path": path }), || {
                println!("{}", path.display())
            })
        }
        ConfigAction::Init { force } => {
            let path = Config::config_path()?;
            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists at {}. Use --force to overwrite.",
                    path.display()
                );
            }
            let path = Config::default().save()?;
            out.emit(&serde_json::json!({ "path": path }), || {
                println!("Wrote default configuration to {}", path.display())
            })
        }
        ConfigAction::Get { key } => {
            let value = Config::load()?.get(&key)?;
            out.emit(&serde_json::json!({ "key": key, "value": value }), || {
                println!("{}", value)
            })
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            out.emit(&serde_json::json!({ "key": key, "value": value }), || {
                println!("Set {} = {}", key, value)
            })
        }
    }
}

// ============================================================================
// Output
// ============================================================================

#[derive(Clone, Copy)]
struct Output {
    format: OutputFormat,
    quiet: bool,
}

impl Output {
    /// Print `value` as JSON, or run `text` unless quiet
    fn emit<T: Serialize>(self, value: &T, text: impl FnOnce()) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
            OutputFormat::Text if !self.quiet => text(),
            OutputFormat::Text => {}
        }
        Ok(())
    }
}

fn print_report(report: &IngestReport) {
    println!(
        "Capabilities: {} created, {} updated",
        report.capabilities_created, report.capabilities_updated
    );
    println!(
        "Agents: {} created, {} updated",
        report.agents_created, report.agents_updated
    );
    println!(
        "Relationships: {} created, {} updated",
        report.relationships_created, report.relationships_updated
    );
}

fn print_agents(agents: &[AgentSummary], empty: &str) {
    if agents.is_empty() {
        println!("{}", empty);
        return;
    }
    for agent in agents {
        println!(
            "  {} ({}) [{}] {}",
            agent.name,
            agent.agent_type,
            agent.capabilities.join(", "),
            agent.status
        );
    }
}

fn print_selection(result: &SelectionResult) {
    if result.strategy == result.resolved_strategy {
        println!("Strategy: {}", result.strategy);
    } else {
        println!("Strategy: {} -> {}", result.strategy, result.resolved_strategy);
    }
    if !result.metadata.required_capabilities.is_empty() {
        println!(
            "Capabilities: {}",
            result.metadata.required_capabilities.join(", ")
        );
    }

    if result.is_empty() {
        println!("No agents selected.");
        if let Some(note) = &result.metadata.note {
            println!("  {}", note);
        }
        return;
    }

    for (i, (agent, score)) in result.agents.iter().zip(&result.scores).enumerate() {
        println!(
            "  {}. {} ({}) score {:.2}, confidence {:.2}",
            i + 1,
            agent.name,
            agent.agent_type,
            score.score,
            score.confidence
        );
    }
    println!("Confidence: {:.2}", result.total_confidence);
}

async fn node_names(service: &AgentGraphService, ids: &[String]) -> Vec<String> {
    let mut names = Vec::with_capacity(ids.len());
    for id in ids {
        let name = match service.graph().get_node(id).await {
            Some(node) => node.name,
            None => id.clone(),
        };
        names.push(name);
    }
    names
}
