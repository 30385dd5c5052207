use anyhow::{bail, Context, Result};
use clap::Parser;
use geo::Point;
use std::path::PathBuf;

mod output;

use aquius_network::prelude::*;
use output::{print_summary, write_geojson, write_result_json};

#[derive(Parser, Debug)]
#[command(
    name = "aquius-here",
    author,
    version,
    about = "Query what connects from a point in a scheduled transport network",
    long_about = "Loads a network dataset (nodes, places, links and network filters as JSON), \
                  finds every node within range of a point, and reports the services that \
                  connect from there: route lines weighted by service volume, stops sized by \
                  service, and the population of the places served."
)]
struct Args {
    /// Network dataset JSON file
    #[arg(short, long)]
    dataset: PathBuf,

    /// Longitude of the query point
    #[arg(short = 'x', long, allow_hyphen_values = true)]
    lon: f64,

    /// Latitude of the query point
    #[arg(short = 'y', long, allow_hyphen_values = true)]
    lat: f64,

    /// Search radius in meters
    #[arg(short, long, conflicts_with = "zoom")]
    range: Option<f64>,

    /// Derive the search radius from a web-map zoom level instead
    #[arg(short, long)]
    zoom: Option<u8>,

    /// Network filter index (defaults to the dataset's "n" option, else all products)
    #[arg(short, long)]
    filter: Option<usize>,

    /// Count only this service index instead of the total of all services
    #[arg(long)]
    service: Option<usize>,

    /// Report every node reached by the services, not just those in range
    #[arg(long)]
    served: bool,

    /// Global display scale step, odd from 1 to 9 (defaults to the dataset's "s" option)
    #[arg(short, long)]
    scale: Option<u8>,

    /// Write the result as GeoJSON to this file
    #[arg(long)]
    geojson: Option<PathBuf>,

    /// GeoJSON layers to include
    #[arg(long, value_delimiter = ',', default_value = "here,link,node,place")]
    layers: Vec<String>,

    /// Write the full result with render sizes as JSON to this file
    #[arg(long)]
    json: Option<PathBuf>,

    /// Verbose output (show debug messages)
    #[arg(short, long)]
    verbose: bool,
}

const DEFAULT_ZOOM: u8 = 10;

fn parse_layers(names: &[String]) -> Result<Vec<Layer>> {
    names
        .iter()
        .map(|name| match name.trim() {
            "here" => Ok(Layer::Here),
            "link" => Ok(Layer::Link),
            "node" => Ok(Layer::Node),
            "place" => Ok(Layer::Place),
            other => bail!("Unknown layer: {} (expected here, link, node or place)", other),
        })
        .collect()
}

fn option_index(network: &StaticNetworkProvider, key: &str) -> Option<u64> {
    network.options().get(key).and_then(|v| v.as_u64())
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if args.verbose { "debug" } else { "info" }),
    )
    .format_timestamp(None)
    .init();

    if !args.dataset.exists() {
        bail!("Dataset file does not exist: {}", args.dataset.display());
    }
    let layers = parse_layers(&args.layers)?;

    log::info!("Loading {}", args.dataset.display());
    let (network, report) = Dataset::load(&args.dataset)
        .with_context(|| format!("Failed to load dataset {}", args.dataset.display()))?
        .into_network();
    log::info!(
        "  {} nodes, {} places, {} links, {} network filters",
        report.nodes,
        report.places,
        report.links,
        report.filters
    );
    if report.skipped_links > 0 {
        log::warn!("  Skipped {} malformed links", report.skipped_links);
    }

    let radius_m = match (args.range, args.zoom) {
        (Some(range), _) => range,
        (None, Some(zoom)) => range_for_zoom(zoom),
        (None, None) => {
            let zoom = option_index(&network, "m").map_or(DEFAULT_ZOOM, |m| m.min(30) as u8);
            range_for_zoom(zoom)
        }
    };
    if !radius_m.is_finite() || radius_m < 0.0 {
        bail!("Range must be a non-negative number of meters, got {}", radius_m);
    }

    let filter = args
        .filter
        .or_else(|| option_index(&network, "n").map(|n| n as usize));
    if let Some(index) = filter {
        match network.filter(index) {
            Some(selected) => log::info!(
                "Network filter {}: {}",
                index,
                selected.display_name("en-US").unwrap_or("(unnamed)")
            ),
            None => log::warn!("Network filter {} does not exist, using all products", index),
        }
    }

    let mut query = HereQuery::new(Point::new(args.lon, args.lat), radius_m);
    query.filter = filter;

    let options = QueryOptions {
        service: args.service.map_or(ServiceSelection::Total, ServiceSelection::Index),
        scope: if args.served { NodeScope::Served } else { NodeScope::Here },
    };

    let mut scale = DisplayScale::from_options(network.options());
    if let Some(step) = args.scale {
        scale = DisplayScale { step, ..scale }.normalized();
    }

    log::info!(
        "Querying {:.5},{:.5} within {:.0} m",
        args.lon,
        args.lat,
        radius_m
    );
    let result = here(&network, &query, &options);

    print_summary(&result);

    if let Some(path) = &args.geojson {
        write_geojson(&network, &result, &layers, path).context("Failed to write GeoJSON")?;
        log::info!("Wrote GeoJSON to {}", path.display());
    }

    if let Some(path) = &args.json {
        write_result_json(&network, &result, &scale, path).context("Failed to write result JSON")?;
        log::info!("Wrote result to {}", path.display());
    }

    Ok(())
}
