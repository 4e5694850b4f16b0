use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use gww::prelude::*;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gww")]
#[command(about = "Go-With-the-Winners search on random instances")]
struct Cmd {
    #[command(subcommand)]
    problem: Problem,
}

#[derive(Subcommand)]
enum Problem {
    /// Look for a low-density vertex subset in a graph with a planted independent set
    IndependentSet {
        #[arg(long, default_value_t = 200)]
        vertices: usize,
        #[arg(long, default_value_t = 0.1)]
        p: f64,
        /// Size of the planted set and of every particle
        #[arg(long, default_value_t = 30)]
        size: usize,
        /// Read the graph from a 0/1 adjacency matrix file instead of generating one
        #[arg(long)]
        graph: Option<PathBuf>,
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Look for a proper k-colouring of an Erdős–Rényi graph
    Coloring {
        #[arg(long, default_value_t = 100)]
        vertices: usize,
        #[arg(long, default_value_t = 0.05)]
        p: f64,
        #[arg(long, default_value_t = 4)]
        colors: usize,
        /// Read the graph from a 0/1 adjacency matrix file instead of generating one
        #[arg(long)]
        graph: Option<PathBuf>,
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Decode a noisy all-zero codeword of a Gallager LDPC code
    Ldpc {
        #[arg(long, default_value_t = 120)]
        bits: usize,
        /// Checks per bit
        #[arg(long, default_value_t = 3)]
        column_weight: usize,
        /// Bits per check (must divide --bits)
        #[arg(long, default_value_t = 6)]
        row_weight: usize,
        #[arg(long, default_value_t = 0.05)]
        flip_probability: f64,
        /// Per-bit flip probability applied to the received word when seeding each particle
        #[arg(long, default_value_t = 0.0)]
        init_flip_probability: f64,
        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args)]
struct CommonArgs {
    #[arg(long, default_value_t = 64)]
    population: usize,
    #[arg(long, default_value_t = 64)]
    walk_length: usize,
    /// Deterministic base seed (optional)
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    max_rounds: Option<usize>,
    /// Distance the threshold is pushed past the population median each round
    #[arg(long, default_value_t = 0.0)]
    slack: f64,
    /// Mix particles on the calling thread only
    #[arg(long)]
    serial: bool,
    /// Log every round snapshot from a collector thread
    #[arg(long)]
    rounds_log: bool,
    /// Verify the incremental caches of the result against a rebuild
    #[arg(long)]
    audit: bool,
}

impl CommonArgs {
    fn config(&self) -> GwwConfig {
        GwwConfig {
            population_size: self.population,
            walk_length: self.walk_length,
            seed: self.seed,
            parallel: !self.serial,
            max_rounds: self.max_rounds,
        }
    }

    fn instance_rng(&self) -> SmallRng {
        match self.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();
    let cmd = Cmd::parse();
    match cmd.problem {
        Problem::IndependentSet {
            vertices,
            p,
            size,
            graph,
            common,
        } => independent_set(vertices, p, size, graph.as_deref(), &common),
        Problem::Coloring {
            vertices,
            p,
            colors,
            graph,
            common,
        } => coloring(vertices, p, colors, graph.as_deref(), &common),
        Problem::Ldpc {
            bits,
            column_weight,
            row_weight,
            flip_probability,
            init_flip_probability,
            common,
        } => ldpc(bits, column_weight, row_weight, flip_probability, init_flip_probability, &common),
    }
}

/// Loads `file` when given, otherwise draws an Erdős–Rényi graph.
fn load_or_generate(file: Option<&Path>, vertices: usize, p: f64, rng: &mut SmallRng) -> Result<Graph> {
    let graph = match file {
        Some(path) => Graph::load_from_file(path)?,
        None => Graph::erdos_renyi(vertices, p, rng)?,
    };
    Ok(graph)
}

fn independent_set(vertices: usize, p: f64, size: usize, file: Option<&Path>, common: &CommonArgs) -> Result<()> {
    let mut rng = common.instance_rng();
    let (graph, planted) = match file {
        Some(_) => (load_or_generate(file, vertices, p, &mut rng)?, None),
        None => {
            let (graph, planted) = Graph::with_planted_independent_set(vertices, p, size, &mut rng)?;
            (graph, Some(planted.len()))
        }
    };
    let graph = Arc::new(graph);
    info!(
        vertices = graph.vertex_count(),
        edges = graph.edge_count(),
        planted = ?planted,
        "independent-set instance"
    );

    let search = GwwSearch::new(
        common.config(),
        SwapWalk,
        MedianSchedule::new(Direction::Minimize, 0.0).with_slack(common.slack),
        |rng| SubsetTracker::random(Arc::clone(&graph), size, rng),
    )?;
    let outcome = drive(search, common.rounds_log)?;
    if common.audit {
        audit(&outcome.best)?;
    }

    let mut best = outcome.best;
    let removed = descend(&mut best, Direction::Minimize, None)?;
    let members = best.members();
    println!("state:        {}", outcome.state);
    println!("rounds:       {}", outcome.rounds);
    println!("density:      {:.4}", outcome.best_seen.density());
    println!("independent:  {} vertices after removing {removed}", members.len());
    if let Some(planted) = planted {
        println!("planted size: {planted}");
    }
    Ok(())
}

fn coloring(vertices: usize, p: f64, colors: usize, file: Option<&Path>, common: &CommonArgs) -> Result<()> {
    let mut rng = common.instance_rng();
    let graph = Arc::new(load_or_generate(file, vertices, p, &mut rng)?);
    info!(vertices = graph.vertex_count(), edges = graph.edge_count(), colors, "coloring instance");

    let search = GwwSearch::new(
        common.config(),
        RandomRecolor,
        MedianSchedule::new(Direction::Minimize, 0.0).with_slack(common.slack),
        |rng| ColoringTracker::random(Arc::clone(&graph), colors, rng),
    )?;
    let outcome = drive(search, common.rounds_log)?;
    if common.audit {
        audit(&outcome.best)?;
    }

    let mut best = outcome.best_seen;
    let polished = descend_coloring(&mut best, None)?;
    println!("state:     {}", outcome.state);
    println!("rounds:    {}", outcome.rounds);
    println!("conflicts: {} (after {polished} greedy recolourings)", best.conflicts());
    println!("proper:    {}", best.is_proper());
    Ok(())
}

fn ldpc(
    bits: usize,
    column_weight: usize,
    row_weight: usize,
    flip_probability: f64,
    init_flip_probability: f64,
    common: &CommonArgs,
) -> Result<()> {
    let mut rng = common.instance_rng();
    let code = Arc::new(ParityCode::gallager(bits, column_weight, row_weight, &mut rng)?);
    let codeword = vec![false; bits];
    let received = ParityTracker::perturbed(Arc::clone(&code), &codeword, flip_probability, &mut rng)?;
    let goal = code.total_weight() as f64;
    info!(
        bits,
        checks = code.check_count(),
        errors = received.hamming_distance(&codeword)?,
        "ldpc instance"
    );
    let received_bits = received.assignment();

    let search = GwwSearch::new(
        common.config(),
        UniformFlip,
        MedianSchedule::new(Direction::Maximize, goal).with_slack(common.slack),
        |rng| ParityTracker::perturbed(Arc::clone(&code), &received_bits, init_flip_probability, rng),
    )?;
    let outcome = drive(search, common.rounds_log)?;
    if common.audit {
        audit(&outcome.best)?;
    }

    let mut best = outcome.best_seen;
    descend(&mut best, Direction::Maximize, None)?;
    println!("state:     {}", outcome.state);
    println!("rounds:    {}", outcome.rounds);
    println!("satisfied: {}/{}", best.score(), best.total_weight());
    println!("distance:  {} from the sent codeword", best.hamming_distance(&codeword)?);
    Ok(())
}

/// Runs `search` to completion, optionally streaming round snapshots to a logging thread.
fn drive<T, P, S>(search: GwwSearch<T, P, S>, rounds_log: bool) -> Result<SearchOutcome<T>>
where
    T: IncrementalTracker + 'static,
    T::Value: 'static,
    P: MovePolicy<T>,
    S: ThresholdSchedule,
{
    if !rounds_log {
        return Ok(search.run()?);
    }
    let (collector, rx) = ChannelCollector::<T::Value>::new();
    let logger = std::thread::spawn(move || {
        for snapshot in rx {
            info!(
                round = snapshot.round,
                threshold = snapshot.threshold,
                particles = snapshot.particles.len(),
                min_fitness = ?snapshot.min_fitness(),
                max_fitness = ?snapshot.max_fitness(),
                "round"
            );
        }
    });
    let outcome = search.with_observer(collector).run();
    logger.join().map_err(|_| anyhow!("round logger thread panicked"))?;
    Ok(outcome?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cmd::command().debug_assert();
    }

    #[test]
    fn graph_and_init_flip_options_parse() {
        let cmd = Cmd::try_parse_from(["gww", "coloring", "--graph", "g.txt", "--colors", "3"]).unwrap();
        assert!(matches!(
            cmd.problem,
            Problem::Coloring { colors: 3, graph: Some(ref path), .. } if path == Path::new("g.txt")
        ));
        let cmd = Cmd::try_parse_from(["gww", "ldpc", "--init-flip-probability", "0.02"]).unwrap();
        assert!(matches!(
            cmd.problem,
            Problem::Ldpc { init_flip_probability, .. } if init_flip_probability == 0.02
        ));
    }

    #[test]
    fn graph_file_takes_precedence_over_generation() {
        let path = std::env::temp_dir().join(format!("gww-cli-graph-{}.txt", std::process::id()));
        std::fs::write(&path, "0 1 0\n1 0 1\n0 1 0\n").unwrap();
        let mut rng = SmallRng::seed_from_u64(1);
        let loaded = load_or_generate(Some(&path), 50, 0.5, &mut rng);
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded.unwrap(), Graph::path(3));

        let generated = load_or_generate(None, 12, 0.0, &mut rng).unwrap();
        assert_eq!(generated.vertex_count(), 12);
        assert_eq!(generated.edge_count(), 0);
        assert!(load_or_generate(Some(Path::new("/nonexistent/gww.txt")), 5, 0.1, &mut rng).is_err());
    }
}
