use std::collections::HashSet;

use aquius_network::prelude::*;
use aquius_network::query::compress_routes;
use aquius_network::query::aggregate;
use geo::Point;

const A: NodeId = NodeId(0);
const B: NodeId = NodeId(1);
const C: NodeId = NodeId(2);

/// Three stops one degree of latitude apart (~111km), each in its own town,
/// with A and B sharing a town.
fn line_network(link_props: &str) -> StaticNetworkProvider {
    let json = format!(
        r#"{{
            "network": [[[0], {{"en-US": "All"}}], [[5], {{"en-US": "Nothing"}}]],
            "node": [[0, 0, {{"p": 0}}], [0, 1, {{"p": 0}}], [0, 2, {{"p": 1}}]],
            "place": [[0, 0.5, {{"p": 1000}}], [0, 2, {{"p": 300}}]],
            "link": [[[0], [12], [0, 1, 2], {}]]
        }}"#,
        link_props
    );
    Dataset::from_json(&json).unwrap().into_network().0
}

fn at_a(radius_m: f64) -> HereQuery {
    HereQuery::new(Point::new(0.0, 0.0), radius_m).with_filter(0)
}

const COVER_ALL: f64 = 250_000.0;
const COVER_AB: f64 = 150_000.0;
const COVER_A: f64 = 10_000.0;

#[test]
fn directional_link_fully_in_range() {
    let network = line_network(r#"{"d": 1}"#);
    let result = here(&network, &at_a(COVER_ALL), &QueryOptions::default());

    assert_eq!(result.here, vec![A, B, C]);
    assert_eq!(result.node_volume.get(&A), Some(&12.0));
    assert_eq!(result.node_volume.get(&B), Some(&12.0));
    assert_eq!(result.node_volume.get(&C), Some(&12.0));
    assert_eq!(
        result.polylines,
        vec![Polyline {
            nodes: vec![A, B, C],
            volume: 12.0
        }]
    );
    assert_eq!(result.link_total, 12.0);
    assert_eq!(result.node_count, 3);
    assert_eq!(result.total_population, 1300.0);
}

#[test]
fn bidirectional_link_partly_in_range() {
    let network = line_network("{}");
    let candidates: HashSet<NodeId> = network.nodes_near(Point::new(0.0, 0.0), COVER_AB).into_iter().collect();
    assert_eq!(candidates.len(), 2);

    let connectivity = aggregate(network.links(), &network.filters()[0], &candidates, ServiceSelection::Total);
    assert_eq!(connectivity.pair_volume.get(A, B), Some(12.0));
    assert_eq!(connectivity.pair_volume.get(B, A), Some(12.0));
    assert_eq!(connectivity.pair_volume.get(B, C), Some(6.0));

    let result = here(&network, &at_a(COVER_AB), &QueryOptions::default());
    assert!(!result.node_volume.contains_key(&C));
    assert_eq!(result.node_volume.get(&A), Some(&12.0));
    assert_eq!(result.link_total, 12.0);
}

#[test]
fn half_volume_rule() {
    let json = r#"{
        "node": [[0, 0], [0, 1]],
        "link": [[[0], [10], [0, 1], {}]]
    }"#;
    let network = Dataset::from_json(json).unwrap().into_network().0;

    let options = QueryOptions {
        scope: NodeScope::Served,
        ..Default::default()
    };
    let result = here(&network, &HereQuery::new(Point::new(0.0, 1.0), COVER_A), &options);

    // Only B is in range: A sees half of the two-way total
    assert_eq!(result.node_volume.get(&A), Some(&5.0));
    assert_eq!(result.node_volume.get(&B), Some(&10.0));
    assert_eq!(result.polylines[0].volume, 5.0);
}

#[test]
fn split_link_reached_through_common_node() {
    let network = line_network(r#"{"t": [1]}"#);
    let result = here(&network, &at_a(COVER_A), &QueryOptions::default());

    assert_eq!(result.here, vec![A]);
    assert_eq!(result.link_total, 0.0);
    assert!(result.node_volume.is_empty());
    assert_eq!(result.node_count, 0);
}

#[test]
fn split_link_total_drops_once_common_section_is_in_range() {
    let network = line_network(r#"{"t": [2]}"#);
    let at_c = |radius_m| HereQuery::new(Point::new(0.0, 2.0), radius_m).with_filter(0);

    // Only the branch is in range: the link counts in full
    let branch = here(&network, &at_c(COVER_A), &QueryOptions::default());
    assert_eq!(branch.here, vec![C]);
    assert_eq!(branch.link_total, 12.0);

    // The common section is counted by its parent, so the total falls
    let wider = here(&network, &at_c(COVER_AB), &QueryOptions::default());
    assert_eq!(wider.here, vec![B, C]);
    assert_eq!(wider.link_total, 0.0);
    assert!(wider.node_count >= branch.node_count);
    assert!(wider.total_population >= branch.total_population);
}

#[test]
fn place_counted_once() {
    let network = line_network(r#"{"d": 1}"#);
    let result = here(&network, &at_a(COVER_AB), &QueryOptions::default());

    // A and B resolve to the same place
    assert_eq!(result.served_places, vec![PlaceId(0)]);
    assert_eq!(result.total_population, 1000.0);
}

#[test]
fn empty_selection_is_all_zero() {
    let network = line_network("{}");
    let query = HereQuery::new(Point::new(50.0, 50.0), COVER_A);
    let result = here(&network, &query, &QueryOptions::default());

    assert!(result.is_empty());
    assert_eq!(result, HereResult::empty(&query));
}

#[test]
fn filter_without_matching_products() {
    let network = line_network("{}");
    let query = HereQuery::new(Point::new(0.0, 0.0), COVER_ALL).with_filter(1);
    let result = here(&network, &query, &QueryOptions::default());

    assert_eq!(result.here.len(), 3);
    assert!(result.is_empty());
    assert_eq!(result.link_total, 0.0);
}

#[test]
fn out_of_range_filter_means_all_products() {
    let network = line_network("{}");
    let query = HereQuery::new(Point::new(0.0, 0.0), COVER_ALL).with_filter(99);
    let result = here(&network, &query, &QueryOptions::default());
    assert_eq!(result.link_total, 12.0);
}

#[test]
fn node_volumes_non_negative_and_in_range() {
    let network = branching_network();
    for radius in [0.0, 5_000.0, 60_000.0, 120_000.0, 300_000.0] {
        let result = here(&network, &HereQuery::new(Point::new(0.0, 0.0), radius), &QueryOptions::default());
        let in_range: HashSet<NodeId> = result.here.iter().copied().collect();
        for (node, volume) in &result.node_volume {
            assert!(*volume >= 0.0);
            assert!(in_range.contains(node));
        }
    }
}

#[test]
fn radius_monotonicity() {
    let network = branching_network();
    assert!(network.links().iter().any(|link| link.properties.split.is_some()));
    let mut previous: Option<HereResult> = None;

    for radius in [0.0, 5_000.0, 60_000.0, 120_000.0, 200_000.0, 300_000.0] {
        let result = here(&network, &HereQuery::new(Point::new(0.0, 0.0), radius), &QueryOptions::default());
        if let Some(previous) = &previous {
            // link_total is left out: split links leave it once their
            // common section comes into range
            assert!(result.node_count >= previous.node_count);
            assert!(result.total_population >= previous.total_population);
        }
        previous = Some(result);
    }
}

#[test]
fn compression_covers_each_edge_once() {
    let network = branching_network();
    let candidates: HashSet<NodeId> = network.nodes_near(Point::new(0.0, 0.0), 300_000.0).into_iter().collect();
    let connectivity = aggregate(network.links(), &NetworkFilter::all(), &candidates, ServiceSelection::Total);

    let mut expected: Vec<(NodeId, NodeId)> = connectivity
        .pair_volume
        .canonical_edges()
        .iter()
        .map(|e| (e.from, e.to))
        .collect();
    expected.sort();

    let polylines = compress_routes(&connectivity.pair_volume);
    let mut used: Vec<(NodeId, NodeId)> = polylines.iter().flat_map(|p| p.edges()).collect();
    used.sort();

    assert_eq!(used, expected);
}

#[test]
fn idempotent() {
    let network = branching_network();
    let query = HereQuery::new(Point::new(0.0, 0.5), 120_000.0);
    let first = serde_json::to_string(&here(&network, &query, &QueryOptions::default())).unwrap();
    let second = serde_json::to_string(&here(&network, &query, &QueryOptions::default())).unwrap();
    assert_eq!(first, second);
}

#[test]
fn snapshot_queries_are_unaffected_by_publish() {
    let handle = NetworkHandle::new(line_network(r#"{"d": 1}"#));
    let snapshot = handle.snapshot();
    handle.publish(StaticNetworkProvider::new());

    let result = here(snapshot.as_ref(), &at_a(COVER_ALL), &QueryOptions::default());
    assert_eq!(result.link_total, 12.0);

    let latest = here(handle.snapshot().as_ref(), &at_a(COVER_ALL), &QueryOptions::default());
    assert!(latest.is_empty());
}

/// A trunk with a branch, a directional circular, a split link and a
/// second service index, spread north from the origin.
fn branching_network() -> StaticNetworkProvider {
    let json = r#"{
        "node": [
            [0, 0, {"p": 0}], [0, 0.5, {"p": 0}], [0, 1.0, {"p": 1}],
            [0.5, 1.5, {"p": 2}], [-0.5, 1.5, {"p": 2}], [0, 2.5, {}]
        ],
        "place": [[0, 0, {"p": 500}], [0, 1, {"p": 200}], [0, 1.5, {"p": 800}]],
        "link": [
            [[0], [10, 2], [0, 1, 2, 3], {}],
            [[0], [4, 0], [0, 1, 2, 4], {}],
            [[1], [6, 1], [2, 3, 5, 4, 2], {"c": 1, "d": 1}],
            [[0], [3, 3], [1, 2, 5], {"d": 1}],
            [[0], [5, 0], [1, 2, 5], {"t": [1]}]
        ]
    }"#;
    Dataset::from_json(json).unwrap().into_network().0
}
