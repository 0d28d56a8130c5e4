//! CLI entry point for the lineage-cluster batch job.
//!
//! `run` executes the whole pipeline; the other subcommands execute single
//! steps. Results are written to stdout as JSON, logs to stderr.

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use lineage_core::LineageConfig;
use lineage_graph::{GraphClient, GraphConfig};
use lineage_journal::store::{FsJournalStore, HistoryFilter};

use lineage_cluster::journal::RunJournal;
use lineage_cluster::pipeline::{describe_degrees, describe_membership, describe_persisted};
use lineage_cluster::{Pipeline, RunOptions};

#[derive(Parser)]
#[command(name = "lineage-cluster")]
#[command(about = "Cluster a genealogy graph and write the clusters back")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file prefix (default: lineage).
    #[arg(short, long, default_value = "lineage", global = true)]
    config: String,

    /// Do not write a run journal record.
    #[arg(long, global = true)]
    no_journal: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Run every step: probe, cluster, mutate ontology, persist, degree, persist.
    Run {
        /// Delete clusters from earlier runs before persisting new ones.
        #[arg(long)]
        prune: bool,
    },
    /// Print a few person vertices to check connectivity.
    Probe {
        /// Maximum vertices to print (default from config).
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Compute clusters and print them without writing anything.
    Clusters,
    /// Declare the grouping relation and the cluster entity.
    Ontology,
    /// Compute clusters and persist them as cluster vertices.
    PersistClusters,
    /// Compute cluster degrees and print them without writing anything.
    Degrees,
    /// Compute cluster degrees and attach them to the clusters.
    PersistDegrees,
    /// Show vertex counts and the clusters currently stored.
    Inspect {
        /// Only list clusters written by this run.
        #[arg(long)]
        run_id: Option<String>,
    },
    /// List journaled runs, newest first.
    History {
        /// Only runs of this command (e.g. run, persist-degrees).
        #[arg(long)]
        command: Option<String>,

        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Run { .. } => "run",
            Self::Probe { .. } => "probe",
            Self::Clusters => "clusters",
            Self::Ontology => "ontology",
            Self::PersistClusters => "persist-clusters",
            Self::Degrees => "degrees",
            Self::PersistDegrees => "persist-degrees",
            Self::Inspect { .. } => "inspect",
            Self::History { .. } => "history",
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let config = LineageConfig::load(&cli.config)?;

    if let Command::History { command, limit } = cli.command {
        let store = FsJournalStore::new(config.pipeline.journal_dir.as_str())?;
        let records = store.history(&HistoryFilter {
            graph: Some(config.neo4j.database.clone()),
            command,
            limit: Some(limit),
        })?;
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    let graph = GraphClient::connect(&GraphConfig::from(&config.neo4j)).await?;
    let ontology = &config.ontology;
    let pipeline = Pipeline::new(&graph, ontology);

    let journal_dir = (!cli.no_journal).then(|| config.pipeline.journal_dir.clone());
    let mut journal = RunJournal::start(
        graph.database(),
        cli.command.name(),
        serde_json::json!({
            "uri": config.neo4j.uri,
            "ontology": ontology,
            "probe_limit": config.pipeline.probe_limit,
        }),
        journal_dir,
    );

    let outcome = execute(&cli.command, &config, &graph, &pipeline, &mut journal).await;
    if let Err(e) = journal.finish() {
        tracing::warn!(error = %e, "Failed to seal run record");
    }

    println!("{}", serde_json::to_string_pretty(&outcome?)?);
    Ok(())
}

async fn execute(
    command: &Command,
    config: &LineageConfig,
    graph: &GraphClient,
    pipeline: &Pipeline<'_, GraphClient>,
    journal: &mut RunJournal,
) -> anyhow::Result<serde_json::Value> {
    let value = match command {
        Command::Run { prune } => {
            let options = RunOptions {
                probe_limit: config.pipeline.probe_limit,
                prune_previous_runs: *prune || config.pipeline.prune_previous_runs,
            };
            serde_json::to_value(pipeline.run_all(&options, journal).await?)?
        }
        Command::Probe { limit } => {
            let limit = limit.unwrap_or(config.pipeline.probe_limit);
            let records = journal
                .track("probe", pipeline.probe(limit), |records| {
                    (
                        format!("Probed {} vertices", records.len()),
                        serde_json::json!({ "count": records.len(), "limit": limit }),
                    )
                })
                .await?;
            serde_json::to_value(records)?
        }
        Command::Clusters => {
            let clusters = journal
                .track("compute_clusters", pipeline.compute_clusters(), describe_membership)
                .await?;
            serde_json::to_value(clusters)?
        }
        Command::Ontology => {
            let applied = journal
                .track("mutate_ontology", pipeline.mutate_ontology(), |n| {
                    (
                        format!("Applied {n} ontology declarations"),
                        serde_json::json!({ "declarations": n }),
                    )
                })
                .await?;
            serde_json::json!({ "declarations": applied })
        }
        Command::PersistClusters => {
            let run_id = journal.run_id();
            let clusters = journal
                .track("compute_clusters", pipeline.compute_clusters(), describe_membership)
                .await?;
            let summary = journal
                .track(
                    "persist_clusters",
                    pipeline.persist_clusters(run_id, &clusters),
                    describe_persisted,
                )
                .await?;
            serde_json::to_value(summary)?
        }
        Command::Degrees => {
            let degrees = journal
                .track("degree_of_clusters", pipeline.degree_of_clusters(), describe_degrees)
                .await?;
            serde_json::to_value(degrees)?
        }
        Command::PersistDegrees => {
            let degrees = journal
                .track("degree_of_clusters", pipeline.degree_of_clusters(), describe_degrees)
                .await?;
            let attached = journal
                .track("persist_degrees", pipeline.persist_degrees(&degrees), |n| {
                    (
                        format!("Attached degrees to {n} clusters"),
                        serde_json::json!({ "clusters": n }),
                    )
                })
                .await?;
            serde_json::json!({ "degrees": degrees, "clusters_updated": attached })
        }
        Command::Inspect { run_id } => {
            let ontology = &config.ontology;
            let persons = graph.count_nodes(&ontology.person_label).await?;
            let marriages = graph.count_nodes(&ontology.marriage_label).await?;
            let groupings = graph.count_relationships(&ontology.grouping_type).await?;
            let clusters = graph.list_clusters(ontology, run_id.as_deref()).await?;
            tracing::info!(
                persons,
                marriages,
                clusters = clusters.len(),
                groupings,
                "Graph inspected"
            );
            serde_json::json!({
                "persons": persons,
                "marriages": marriages,
                "groupings": groupings,
                "clusters": clusters,
            })
        }
        Command::History { .. } => anyhow::bail!("history reads the journal, not the graph"),
    };
    Ok(value)
}
