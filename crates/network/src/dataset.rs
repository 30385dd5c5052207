//! Network dataset loading.
//!
//! Datasets arrive as a single JSON object produced by the external GTFS,
//! GeoJSON and merge converters:
//!
//! ```json
//! {
//!   "meta": {"schema": "0"},
//!   "option": {"s": 5},
//!   "network": [[[0, 1], {"en-US": "Rail"}]],
//!   "node": [[-3.70, 40.41, {"p": 0}]],
//!   "place": [[-3.70, 40.42, {"p": 3200000}]],
//!   "link": [[[0], [48], [0, 1, 2], {"d": 1}]]
//! }
//! ```
//!
//! Records are positional arrays whose trailing property object uses short
//! keys (`"d"`) or their long aliases (`"direction"`). Everything is checked
//! and repaired once here, so the query engine can trust what it is given:
//! a malformed record is repaired or skipped, never fatal.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde_json::Value;

use crate::identifiers::*;
use crate::models::types::*;
use crate::provider::StaticNetworkProvider;

const SUPPORTED_SCHEMA: &str = "0";

/// Raw dataset, parsed as JSON but not yet validated
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    pub meta: Metadata,
    pub options: Metadata,
    pub networks: Vec<Value>,
    pub nodes: Vec<Value>,
    pub places: Vec<Value>,
    pub links: Vec<Value>,
}

/// Counts of repairs made while validating a dataset
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub nodes: usize,
    pub places: usize,
    pub links: usize,
    pub filters: usize,
    pub malformed_nodes: usize,
    pub malformed_places: usize,
    pub malformed_filters: usize,
    pub unresolved_places: usize,
    pub skipped_links: usize,
    pub repaired_links: usize,
    pub clamped_values: usize,
}

impl LoadReport {
    pub fn has_repairs(&self) -> bool {
        self.malformed_nodes
            + self.malformed_places
            + self.malformed_filters
            + self.unresolved_places
            + self.skipped_links
            + self.repaired_links
            + self.clamped_values
            > 0
    }

    pub fn log_summary(&self) {
        tracing::debug!(
            nodes = self.nodes,
            places = self.places,
            links = self.links,
            filters = self.filters,
            "Network dataset loaded"
        );
        if self.has_repairs() {
            tracing::warn!(
                malformed_nodes = self.malformed_nodes,
                malformed_places = self.malformed_places,
                malformed_filters = self.malformed_filters,
                unresolved_places = self.unresolved_places,
                skipped_links = self.skipped_links,
                repaired_links = self.repaired_links,
                clamped_values = self.clamped_values,
                "Dataset required repairs"
            );
        }
    }
}

impl Dataset {
    pub fn from_json(json: &str) -> Result<Self> {
        let root: Value = serde_json::from_str(json)?;
        Ok(Self::from_value(root))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let root: Value = serde_json::from_reader(reader)?;
        Ok(Self::from_value(root))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Split a parsed JSON document into its record lists.
    ///
    /// Missing or wrongly typed top-level keys are treated as empty.
    pub fn from_value(root: Value) -> Self {
        let mut root = match root {
            Value::Object(map) => map,
            other => {
                tracing::warn!(kind = json_kind(&other), "Dataset root is not an object");
                Metadata::new()
            }
        };

        let dataset = Self {
            meta: take_object(&mut root, "meta"),
            options: take_object(&mut root, "option"),
            networks: take_array(&mut root, "network"),
            nodes: take_array(&mut root, "node"),
            places: take_array(&mut root, "place"),
            links: take_array(&mut root, "link"),
        };

        if dataset.schema() != SUPPORTED_SCHEMA {
            tracing::warn!(
                schema = %dataset.schema(),
                "Unknown dataset schema, reading as schema {}",
                SUPPORTED_SCHEMA
            );
        }

        dataset
    }

    pub fn schema(&self) -> String {
        match self.meta.get("schema") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => SUPPORTED_SCHEMA.to_string(),
        }
    }

    /// Validate every record and build the in-memory network.
    pub fn into_network(self) -> (StaticNetworkProvider, LoadReport) {
        let mut report = LoadReport::default();
        let place_count = self.places.len();
        let node_count = self.nodes.len();

        let places: Vec<Place> = self
            .places
            .iter()
            .enumerate()
            .map(|(i, value)| parse_place(PlaceId::new(i), value, &mut report))
            .collect();

        let nodes: Vec<Node> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, value)| parse_node(NodeId::new(i), value, place_count, &mut report))
            .collect();

        let links: Vec<Link> = self
            .links
            .iter()
            .enumerate()
            .filter_map(|(i, value)| parse_link(LinkId::new(i), value, node_count, &mut report))
            .collect();

        let filters: Vec<NetworkFilter> = self
            .networks
            .iter()
            .map(|value| parse_filter(value, &mut report))
            .collect();

        report.nodes = nodes.len();
        report.places = places.len();
        report.links = links.len();
        report.filters = filters.len();
        report.log_summary();

        let provider = StaticNetworkProvider::from_data(nodes, places, links, filters)
            .with_options(self.options);

        (provider, report)
    }
}

// ============================================================================
// Record parsers
// ============================================================================

fn parse_node(id: NodeId, value: &Value, place_count: usize, report: &mut LoadReport) -> Node {
    let mut node = Node {
        id,
        location: geo::Point::new(f64::NAN, f64::NAN),
        place_id: None,
        reference: Vec::new(),
    };

    let Some(fields) = value.as_array() else {
        tracing::debug!(%id, "Node is not an array");
        report.malformed_nodes += 1;
        return node;
    };

    match coordinates(fields) {
        Some(location) => node.location = location,
        None => {
            tracing::debug!(%id, "Node has no usable coordinates");
            report.malformed_nodes += 1;
        }
    }

    let place = match fields.get(2) {
        Some(Value::Object(props)) => {
            node.reference = references(props);
            props.get("p").map(as_index)
        }
        Some(other @ Value::Number(_)) => Some(as_index(other)),
        _ => None,
    };

    match place {
        Some(Some(index)) if (index as usize) < place_count => {
            node.place_id = Some(PlaceId(index));
        }
        Some(_) => {
            tracing::debug!(%id, "Node place does not resolve");
            report.unresolved_places += 1;
        }
        None => {}
    }

    node
}

fn parse_place(id: PlaceId, value: &Value, report: &mut LoadReport) -> Place {
    let mut place = Place {
        id,
        location: geo::Point::new(f64::NAN, f64::NAN),
        population: 0.0,
        reference: Vec::new(),
    };

    let Some(fields) = value.as_array() else {
        report.malformed_places += 1;
        return place;
    };

    match coordinates(fields) {
        Some(location) => place.location = location,
        None => report.malformed_places += 1,
    }

    let population = match fields.get(2) {
        Some(Value::Object(props)) => {
            place.reference = references(props);
            props.get("p")
        }
        other => other,
    };

    place.population = population
        .map(|value| amount(value, report))
        .unwrap_or(0.0);

    place
}

fn parse_link(
    id: LinkId,
    value: &Value,
    node_count: usize,
    report: &mut LoadReport,
) -> Option<Link> {
    let Some(fields) = value.as_array() else {
        tracing::debug!(%id, "Link is not an array, skipped");
        report.skipped_links += 1;
        return None;
    };

    let mut repaired = false;

    // Route nodes: drop what doesn't resolve, collapse repeated stops
    let mut nodes: Vec<NodeId> = Vec::new();
    for value in fields.get(2).and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[]) {
        match as_index(value) {
            Some(index) if (index as usize) < node_count => {
                let node = NodeId(index);
                if nodes.last() == Some(&node) {
                    repaired = true;
                } else {
                    nodes.push(node);
                }
            }
            _ => repaired = true,
        }
    }

    if nodes.len() < 2 {
        tracing::debug!(%id, nodes = nodes.len(), "Link has fewer than two resolvable nodes, skipped");
        report.skipped_links += 1;
        return None;
    }

    let mut products = product_list(fields.first());
    if products.is_empty() {
        products.push(ProductId(0));
    }
    products.sort_unstable();
    products.dedup();

    let mut volumes: Vec<f64> = match fields.get(1) {
        Some(Value::Array(values)) => values.iter().map(|v| amount(v, report)).collect(),
        Some(value) => vec![amount(value, report)],
        None => Vec::new(),
    };
    if volumes.is_empty() {
        repaired = true;
        volumes.push(0.0);
    }

    let empty = Metadata::new();
    let props = match fields.get(3) {
        Some(Value::Object(props)) => props,
        _ => &empty,
    };

    let mut properties = LinkProperties {
        circular: flag(props, &["c", "circular"]),
        direction: if flag(props, &["d", "direction"]) {
            Direction::Forward
        } else {
            Direction::Bidirectional
        },
        shared: product_list(lookup(props, &["h", "shared"])),
        block: lookup(props, &["b", "block"]).and_then(as_index),
        color: lookup(props, &["o", "color"])
            .and_then(Value::as_str)
            .map(str::to_string),
        reference: references(props),
        ..Default::default()
    };

    if properties.circular && nodes.first() != nodes.last() {
        tracing::debug!(%id, "Circular link does not return to its first node");
        properties.circular = false;
        repaired = true;
    }

    if let Some(split) = lookup(props, &["t", "split"]) {
        let split = route_subset(split, &nodes, &mut repaired);
        if split.is_empty() {
            repaired = true;
        } else {
            properties.split = Some(split);
        }
    }
    if let Some(pickup) = lookup(props, &["u", "pickup"]) {
        properties.pickup_only = route_subset(pickup, &nodes, &mut repaired);
    }
    if let Some(setdown) = lookup(props, &["s", "setdown"]) {
        properties.setdown_only = route_subset(setdown, &nodes, &mut repaired);
    }

    if repaired {
        report.repaired_links += 1;
    }

    Some(Link {
        id,
        products,
        volumes,
        nodes,
        properties,
    })
}

fn parse_filter(value: &Value, report: &mut LoadReport) -> NetworkFilter {
    let Some(fields) = value.as_array() else {
        report.malformed_filters += 1;
        return NetworkFilter::all();
    };

    let mut products = product_list(fields.first());
    products.sort_unstable();
    products.dedup();

    let names = fields
        .get(1)
        .and_then(Value::as_object)
        .map(|names| {
            names
                .iter()
                .filter_map(|(locale, name)| Some((locale.clone(), name.as_str()?.to_string())))
                .collect()
        })
        .unwrap_or_default();

    NetworkFilter {
        products,
        names,
        extra: fields.iter().skip(2).cloned().collect(),
    }
}

// ============================================================================
// Value helpers
// ============================================================================

fn take_object(root: &mut Metadata, key: &str) -> Metadata {
    match root.remove(key) {
        Some(Value::Object(map)) => map,
        _ => Metadata::new(),
    }
}

fn take_array(root: &mut Metadata, key: &str) -> Vec<Value> {
    match root.remove(key) {
        Some(Value::Array(values)) => values,
        _ => Vec::new(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn lookup<'a>(props: &'a Metadata, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| props.get(*key))
}

/// Flags are written as `true` or `1`
fn flag(props: &Metadata, keys: &[&str]) -> bool {
    match lookup(props, keys) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        _ => false,
    }
}

fn as_index(value: &Value) -> Option<u32> {
    if let Some(n) = value.as_u64() {
        return u32::try_from(n).ok();
    }
    value
        .as_f64()
        .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u32::MAX as f64)
        .map(|f| f as u32)
}

/// A non-negative finite quantity; anything else is clamped to zero
fn amount(value: &Value, report: &mut LoadReport) -> f64 {
    match value.as_f64() {
        Some(n) if n.is_finite() && n >= 0.0 => n,
        _ => {
            report.clamped_values += 1;
            0.0
        }
    }
}

fn coordinates(fields: &[Value]) -> Option<geo::Point> {
    let x = fields.first()?.as_f64()?;
    let y = fields.get(1)?.as_f64()?;
    Some(geo::Point::new(x, y))
}

/// A single product id or a list of them. Unreadable entries become product 0.
fn product_list(value: Option<&Value>) -> Vec<ProductId> {
    match value {
        Some(Value::Array(values)) => values
            .iter()
            .map(|v| ProductId(as_index(v).unwrap_or(0)))
            .collect(),
        Some(value @ Value::Number(_)) => vec![ProductId(as_index(value).unwrap_or(0))],
        _ => Vec::new(),
    }
}

/// Node list property restricted to nodes on the route, in route order
fn route_subset(value: &Value, route: &[NodeId], repaired: &mut bool) -> Vec<NodeId> {
    let listed: Vec<NodeId> = match value {
        Value::Array(values) => values.iter().filter_map(as_index).map(NodeId).collect(),
        other => as_index(other).map(NodeId).into_iter().collect(),
    };

    if listed.iter().any(|node| !route.contains(node)) {
        *repaired = true;
    }

    let mut subset: Vec<NodeId> = Vec::new();
    for node in route {
        if listed.contains(node) && !subset.contains(node) {
            subset.push(*node);
        }
    }
    subset
}

fn references(props: &Metadata) -> Vec<Metadata> {
    match lookup(props, &["r", "reference"]) {
        Some(Value::Array(values)) => values
            .iter()
            .filter_map(|v| v.as_object().cloned())
            .collect(),
        Some(Value::Object(map)) => vec![map.clone()],
        _ => Vec::new(),
    }
}
