use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use glam::Vec2;
use springlayout::edge::validate_adjacency;
use springlayout::graph_file::{GraphFile, Snapshot, random_tree};
use springlayout::render::{MarkerStyle, OrbitCamera, markers_to_svg, project_markers};
use springlayout::{Edge, Node, RepulsionMode, Simulation, SimulationConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Spring-electrical force layout for graphs.
#[derive(Parser)]
#[command(name = "springlayout")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lay out a graph file and write node positions
    Run(RunArgs),
    /// Generate a random tree graph
    Generate {
        /// Number of nodes
        #[arg(short, long)]
        nodes: usize,

        /// Random seed
        #[arg(short, long, default_value = "0")]
        seed: u64,

        /// Output graph file (.json)
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Print the sorted adjacency of a graph file
    Inspect {
        /// Input graph file (.json)
        #[arg(short, long)]
        graph: PathBuf,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Input graph file (.json)
    #[arg(short, long)]
    graph: PathBuf,

    /// Simulation config (.yaml, .yml or .json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of frames to simulate
    #[arg(short, long, default_value = "300")]
    frames: usize,

    /// Override the repulsion coefficient
    #[arg(long)]
    repulsion: Option<f32>,

    /// Override the edge attraction coefficient
    #[arg(long)]
    edge_attraction: Option<f32>,

    /// Use Barnes-Hut repulsion with this opening threshold
    #[arg(long)]
    theta: Option<f32>,

    /// Worker threads for the passes (defaults to one per core)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Output positions file
    #[arg(short, long, default_value = "positions.json")]
    output: PathBuf,

    /// Also render the layout as SVG
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Run the passes on the GPU
    #[cfg(feature = "gpu")]
    #[arg(long)]
    gpu: bool,
}

const SVG_VIEWPORT: Vec2 = Vec2::new(800.0, 600.0);

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn load_config(args: &RunArgs) -> anyhow::Result<SimulationConfig> {
    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(repulsion) = args.repulsion {
        config.repulsion = repulsion;
    }
    if let Some(edge_attraction) = args.edge_attraction {
        config.edge_attraction = edge_attraction;
    }
    if let Some(theta) = args.theta {
        config.repulsion_mode = RepulsionMode::BarnesHut { theta };
    }
    config.validate()?;
    Ok(config)
}

fn run(args: &RunArgs) -> anyhow::Result<()> {
    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()?;
    }

    let graph = GraphFile::load(&args.graph)?;
    info!(
        path = %args.graph.display(),
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        "loaded graph"
    );
    let config = load_config(args)?;
    let index = graph.edge_index()?;
    let nodes = graph.nodes();

    #[cfg(feature = "gpu")]
    if args.gpu {
        let mut layout = springlayout::gpu::GpuLayout::new(nodes, &index, config)?;
        layout.run(args.frames)?;
        let nodes = layout.read_nodes()?;
        return write_outputs(args, layout.frame(), &nodes, index.edges());
    }

    let mut sim = Simulation::from_index(nodes, index, config)?;
    let stats = sim.run(args.frames)?;
    info!(
        frames = stats.frame,
        clamped = stats.clamped,
        gated = stats.gated,
        max_displacement = stats.max_displacement,
        "layout finished"
    );

    write_outputs(args, sim.frame(), sim.nodes(), sim.edges())
}

fn write_outputs(
    args: &RunArgs,
    frame: u64,
    nodes: &[Node],
    edges: &[Edge],
) -> anyhow::Result<()> {
    Snapshot::capture(frame, nodes).save(&args.output)?;
    println!(
        "Wrote {} node positions after {} frames to {}",
        nodes.len(),
        frame,
        args.output.display()
    );

    if let Some(svg_path) = &args.svg {
        write_svg(svg_path, nodes, edges)?;
        println!("Rendered layout to {}", svg_path.display());
    }
    Ok(())
}

fn write_svg(path: &Path, nodes: &[Node], edges: &[Edge]) -> anyhow::Result<()> {
    let camera = OrbitCamera::new(SVG_VIEWPORT.x / SVG_VIEWPORT.y);
    let markers = project_markers(
        nodes,
        camera.view_projection(),
        SVG_VIEWPORT,
        &MarkerStyle::default(),
    );
    std::fs::write(path, markers_to_svg(&markers, edges, SVG_VIEWPORT))?;
    Ok(())
}

fn generate(nodes: usize, seed: u64, output: &Path) -> anyhow::Result<()> {
    let graph = random_tree(nodes, seed);
    graph.save(output)?;
    println!(
        "Generated {} nodes and {} edges in {}",
        graph.nodes.len(),
        graph.edges.len(),
        output.display()
    );
    Ok(())
}

fn inspect(path: &Path) -> anyhow::Result<()> {
    let graph = GraphFile::load(path)?;
    let index = graph.edge_index()?;
    let mut nodes = graph.nodes();
    index.install(&mut nodes)?;
    validate_adjacency(&nodes, index.edges())?;
    info!(path = %path.display(), "adjacency is valid");

    println!(
        "{} nodes, {} sorted edges{}",
        index.node_count(),
        index.edge_count(),
        if graph.directed { "" } else { " (reverse edges added)" }
    );
    println!("{index}");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run(&args)?,
        Commands::Generate {
            nodes,
            seed,
            output,
        } => generate(nodes, seed, &output)?,
        Commands::Inspect { graph } => inspect(&graph)?,
    }

    Ok(())
}
