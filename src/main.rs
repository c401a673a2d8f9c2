mod app;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use graph_lens::GraphViewConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// JSON dataset with `nodes`, `edges` and optional `clusters`/`pathways`.
    #[arg(long)]
    dataset: PathBuf,

    /// JSON view configuration; command line options override it.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    max_nodes: Option<usize>,

    /// Node type to show, or "all".
    #[arg(long)]
    type_filter: Option<String>,

    #[arg(long)]
    search: Option<String>,

    #[arg(long)]
    cluster: Option<String>,

    #[arg(long)]
    pathway: Option<String>,

    #[arg(long)]
    show_pathways: bool,

    #[arg(long)]
    width: Option<f32>,

    #[arg(long)]
    height: Option<f32>,

    /// Tracing filter directive, e.g. `graph_lens=debug`.
    #[arg(long, default_value = "graph_lens=info")]
    log_level: String,
}

impl Args {
    fn view_config(&self) -> Result<GraphViewConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                GraphViewConfig::from_json_str(&raw)
                    .with_context(|| format!("failed to parse config {}", path.display()))?
            }
            None => GraphViewConfig::default(),
        };

        if let Some(max_nodes) = self.max_nodes {
            config.max_nodes = Some(max_nodes);
        }
        if let Some(kind) = &self.type_filter {
            config.node_type_filter = kind.clone();
        }
        if let Some(search) = &self.search {
            config.search_term = search.clone();
        }
        if let Some(cluster) = &self.cluster {
            config.active_cluster_id = Some(cluster.clone());
        }
        if let Some(pathway) = &self.pathway {
            config.active_pathway_id = Some(pathway.clone());
        }
        if self.show_pathways {
            config.show_pathways = true;
        }
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        Ok(config)
    }
}

fn init_tracing(directive: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let config = args.view_config()?;
    info!(dataset = %args.dataset.display(), "starting graph-lens");

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([config.width + 720.0, config.height + 120.0]),
        ..Default::default()
    };

    let dataset = args.dataset;
    eframe::run_native(
        "graph-lens",
        options,
        Box::new(move |cc| Ok(Box::new(app::GraphLensApp::new(cc, dataset, config)))),
    )
    .map_err(|error| anyhow::anyhow!("failed to run the viewer: {error}"))
}
