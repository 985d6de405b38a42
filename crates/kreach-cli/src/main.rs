//! kreach CLI
//!
//! Operator surface over the proving engine.
//!
//! # Commands
//!
//! - `kreach prove <claims.json>` - Prove a batch of claims
//! - `kreach show <claim-id>` - Dump a persisted proof graph
//! - `kreach prune <claim-id> <node>` - Remove a node and its subgraph
//! - `kreach step <claim-id> <node> --depth N` - Force N rewrite steps
//! - `kreach merge <claim-id> --nodes A,B` - Merge frontier nodes
//! - `kreach section <claim-id> --edge A,B --sections N` - Insert checkpoints
//!
//! `prove` exits with the number of failed proofs (0 = all passed).
//! Editing commands load the persisted record, apply one operation, and
//! save it back atomically.

use anyhow::Context;
use clap::{Parser, Subcommand};
use kreach_backend::{BackendConfig, RpcBackend};
use kreach_explore::{editor, Explorer};
use kreach_graph::{Edge, NodeId};
use kreach_prove::{prove_batch, Claim, Proof, ProofStore, ProverConfig, ProverKind};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "kreach")]
#[command(about = "Reachability proofs over a term-rewriting/SMT backend")]
#[command(version)]
struct Cli {
    /// Proof store directory
    #[arg(long, global = true, default_value = "out/proofs")]
    store: PathBuf,

    /// Backend service address
    #[arg(long, global = true, default_value = "127.0.0.1:31425")]
    backend: String,

    /// Per-call backend timeout in seconds
    #[arg(long, global = true, default_value_t = 30)]
    smt_timeout: u64,

    /// Retries for a timed-out backend call
    #[arg(long, global = true, default_value_t = 3)]
    smt_retry_limit: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prove every claim in a claims file
    Prove {
        /// JSON file with a list of {id, init, target} claims
        claims: PathBuf,
        /// Parallel proof workers
        #[arg(long, default_value_t = 1)]
        workers: usize,
        /// Backend depth budget per expansion
        #[arg(long, default_value_t = 1000)]
        max_depth: usize,
        /// Expansion budget per proof
        #[arg(long)]
        max_iterations: Option<usize>,
        /// Loop bound; selects the bounded-model-checking prover
        #[arg(long)]
        bmc_depth: Option<usize>,
        /// Rules that end execution at a leaf candidate
        #[arg(long = "terminal-rule")]
        terminal_rules: Vec<String>,
        /// Rules that stop execution at a branch point
        #[arg(long = "cut-point-rule")]
        cut_point_rules: Vec<String>,
        /// Attach counterexample models to failure reports
        #[arg(long)]
        counterexample_info: bool,
    },
    /// Print a persisted proof graph
    Show {
        /// Claim id
        claim: String,
    },
    /// Remove a node and everything only it reaches
    Prune {
        claim: String,
        node: u64,
    },
    /// Force execution from a node for exactly N steps
    Step {
        claim: String,
        node: u64,
        #[arg(long, default_value_t = 1)]
        depth: usize,
    },
    /// Merge frontier nodes into one disjunction node
    Merge {
        claim: String,
        /// Node ids to merge
        #[arg(long, value_delimiter = ',', required = true)]
        nodes: Vec<u64>,
    },
    /// Re-execute a step edge in even increments, inserting checkpoints
    Section {
        claim: String,
        /// Source and target node of the step edge
        #[arg(long, value_delimiter = ',', required = true)]
        edge: Vec<u64>,
        #[arg(long, default_value_t = 2)]
        sections: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let store = ProofStore::new(&cli.store);
    let backend_config = BackendConfig::new(cli.backend.clone())
        .with_timeout(Duration::from_secs(cli.smt_timeout))
        .with_retry_limit(cli.smt_retry_limit);

    match cli.command {
        Commands::Prove {
            claims,
            workers,
            max_depth,
            max_iterations,
            bmc_depth,
            terminal_rules,
            cut_point_rules,
            counterexample_info,
        } => {
            let claims = load_claims(&claims)?;
            let kind = match bmc_depth {
                Some(bound) => ProverKind::Bmc { bound },
                None => ProverKind::Apr,
            };
            let mut config = ProverConfig::default()
                .with_execute_depth(max_depth)
                .with_terminal_rules(terminal_rules)
                .with_cut_point_rules(cut_point_rules)
                .with_counterexample_info(counterexample_info);
            if let Some(max) = max_iterations {
                config = config.with_max_iterations(max);
            }

            let outcomes = prove_batch(claims, kind, config, workers, Some(store), move || {
                RpcBackend::connect(backend_config.clone())
            })
            .await?;

            let mut failed = 0;
            for (id, outcome) in &outcomes {
                if outcome.passed() {
                    println!("PASSED: {id}");
                    continue;
                }
                failed += 1;
                println!("FAILED: {id}");
                if let Some(error) = &outcome.error {
                    println!("  {error}");
                }
                if let Some(report) = &outcome.report {
                    print!("{report}");
                }
            }
            println!("{} of {} proofs passed", outcomes.len() - failed, outcomes.len());
            std::process::exit(failed.min(255) as i32);
        }
        Commands::Show { claim } => {
            let proof = store.load(&claim)?;
            print!("{}", render_proof(&proof));
        }
        Commands::Prune { claim, node } => {
            let mut proof = store.load(&claim)?;
            let removed = editor::prune(&mut proof.graph, NodeId(node))?;
            store.save(&proof)?;
            info!(claim, ?removed, "pruned");
            println!(
                "Pruned {} nodes: {}",
                removed.len(),
                removed
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        Commands::Step { claim, node, depth } => {
            let mut proof = store.load(&claim)?;
            let mut explorer = connect(backend_config)?;
            let new = explorer.step(&mut proof.graph, NodeId(node), depth)?;
            store.save(&proof)?;
            println!("Stepped node {node} by {depth} to new node {new}");
        }
        Commands::Merge { claim, nodes } => {
            let mut proof = store.load(&claim)?;
            let ids: Vec<NodeId> = nodes.into_iter().map(NodeId).collect();
            let merged = editor::merge(&mut proof.graph, &ids)?;
            store.save(&proof)?;
            println!("Merged into new node {merged}");
        }
        Commands::Section {
            claim,
            edge,
            sections,
        } => {
            let (source, target) = match edge.as_slice() {
                &[source, target] => (source, target),
                _ => anyhow::bail!("--edge takes exactly two node ids, e.g. --edge 3,7"),
            };
            let mut proof = store.load(&claim)?;
            let mut explorer = connect(backend_config)?;
            let inserted = explorer.section_edge(
                &mut proof.graph,
                NodeId(source),
                NodeId(target),
                sections,
            )?;
            store.save(&proof)?;
            println!(
                "Inserted {} checkpoint nodes: {}",
                inserted.len(),
                inserted
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }
    Ok(())
}

fn connect(config: BackendConfig) -> anyhow::Result<Explorer<RpcBackend>> {
    Ok(Explorer::new(RpcBackend::connect(config)?))
}

fn load_claims(path: &PathBuf) -> anyhow::Result<Vec<Claim>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("cannot read claims file {}", path.display()))?;
    let claims: Vec<Claim> = serde_json::from_slice(&bytes)
        .with_context(|| format!("malformed claims file {}", path.display()))?;
    anyhow::ensure!(!claims.is_empty(), "claims file is empty");
    Ok(claims)
}

fn render_proof(proof: &Proof) -> String {
    let mut out = String::new();
    out.push_str(&format!("{proof}\n"));
    out.push_str("Nodes:\n");
    for node in proof.graph.nodes() {
        let mut tags = Vec::new();
        if node.id == proof.graph.init() {
            tags.push("init");
        }
        if proof.graph.is_target(node.id) {
            tags.push("target");
        }
        if proof.graph.is_stuck(node.id) {
            tags.push("stuck");
        }
        if proof.graph.is_vacuous(node.id) {
            tags.push("vacuous");
        }
        let tags = if tags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", tags.join(", "))
        };
        out.push_str(&format!("  {}{}: {}\n", node.id, tags, node.state));
    }
    out.push_str("Edges:\n");
    for (source, edge) in proof.graph.edges() {
        match edge {
            Edge::Step {
                target,
                depth,
                rules,
            } => {
                if rules.is_empty() {
                    out.push_str(&format!("  {source} -{depth}-> {target}\n"));
                } else {
                    out.push_str(&format!(
                        "  {source} -{depth}-> {target} ({})\n",
                        rules.join(", ")
                    ));
                }
            }
            Edge::Split { branches } => {
                for branch in branches {
                    out.push_str(&format!(
                        "  {source} =?=> {} if {}\n",
                        branch.target, branch.predicate
                    ));
                }
            }
            Edge::Cover { target } => {
                out.push_str(&format!("  {source} =cover=> {target}\n"));
            }
        }
    }
    for (node, reason) in proof.graph.stuck() {
        out.push_str(&format!("Stuck {node}: {reason}\n"));
    }
    out
}
