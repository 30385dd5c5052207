use anyhow::{Context, Result};
use aquius_network::prelude::*;
use geojson::GeoJson;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Render-ready sizes alongside the raw result
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RenderedResult<'a> {
    #[serde(flatten)]
    result: &'a HereResult,
    scale: DisplayScale,
    line_weights: Vec<u32>,
    node_radii: BTreeMap<NodeId, u32>,
    place_radii: BTreeMap<PlaceId, u32>,
    services: Vec<Service<'a>>,
}

/// Descriptive flags of one counted link
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Service<'a> {
    link: LinkId,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    block: Option<u32>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    pickup_only: &'a [NodeId],
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    setdown_only: &'a [NodeId],
}

impl<'a> Service<'a> {
    fn new(link: &'a Link) -> Self {
        Self {
            link: link.id,
            color: link.properties.color.as_deref(),
            block: link.properties.block,
            pickup_only: &link.properties.pickup_only,
            setdown_only: &link.properties.setdown_only,
        }
    }
}

impl<'a> RenderedResult<'a> {
    fn new<P: NetworkProvider>(network: &'a P, result: &'a HereResult, scale: &DisplayScale) -> Self {
        Self {
            result,
            scale: *scale,
            line_weights: result
                .polylines
                .iter()
                .map(|p| scale.line_weight(p.volume))
                .collect(),
            node_radii: result
                .node_volume
                .iter()
                .map(|(id, volume)| (*id, scale.node_radius(*volume)))
                .collect(),
            place_radii: result
                .served_places
                .iter()
                .filter_map(|id| network.place(*id))
                .map(|place| (place.id, scale.place_radius(place.population)))
                .collect(),
            services: result
                .links
                .iter()
                .filter_map(|id| network.link(*id))
                .map(Service::new)
                .collect(),
        }
    }
}

pub fn print_summary(result: &HereResult) {
    log::info!("=== Connectivity ===");
    log::info!("Nodes in range: {}", result.here.len());
    log::info!("Services: {}", result.link_total);
    log::info!("Stops: {}", result.node_count);
    log::info!("Population: {}", result.total_population);
    log::info!("Route lines: {}", result.polylines.len());
    log::info!("Links counted: {}", result.links.len());
    if result.is_empty() {
        log::warn!("Nothing connects from here");
    }
}

pub fn write_geojson<P: NetworkProvider>(
    network: &P,
    result: &HereResult,
    layers: &[Layer],
    output_path: &Path,
) -> Result<()> {
    let feature_collection = result.to_geojson(network, layers);
    log::info!(
        "Writing {} features to {}",
        feature_collection.features.len(),
        output_path.display()
    );

    let geojson = GeoJson::from(feature_collection);
    let json_string = serde_json::to_string_pretty(&geojson)
        .context("Failed to serialize GeoJSON")?;

    std::fs::write(output_path, json_string)
        .with_context(|| format!("Failed to write GeoJSON to {}", output_path.display()))?;

    Ok(())
}

pub fn write_result_json<P: NetworkProvider>(
    network: &P,
    result: &HereResult,
    scale: &DisplayScale,
    output_path: &Path,
) -> Result<()> {
    let rendered = RenderedResult::new(network, result, scale);
    let json_string = serde_json::to_string_pretty(&rendered)
        .context("Failed to serialize result")?;

    std::fs::write(output_path, json_string)
        .with_context(|| format!("Failed to write result to {}", output_path.display()))?;

    Ok(())
}
