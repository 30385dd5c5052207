//! GeoJSON export of query results.

use geojson::{Feature, FeatureCollection, Geometry, Value};
use serde::{Deserialize, Serialize};

use crate::models::traits::NetworkProvider;
use crate::query::HereResult;

/// Feature layers a result can be exported as
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Here,
    Link,
    Node,
    Place,
}

impl Layer {
    pub const ALL: [Layer; 4] = [Layer::Here, Layer::Link, Layer::Node, Layer::Place];

    pub fn name(self) -> &'static str {
        match self {
            Layer::Here => "here",
            Layer::Link => "link",
            Layer::Node => "node",
            Layer::Place => "place",
        }
    }
}

fn feature(layer: Layer, geometry: Value, value: f64) -> Feature {
    let mut properties = serde_json::Map::new();
    properties.insert("type".to_string(), serde_json::json!(layer.name()));
    properties.insert("value".to_string(), serde_json::json!(value));

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(geometry)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn position(point: geo::Point) -> Option<Vec<f64>> {
    (point.x().is_finite() && point.y().is_finite()).then(|| vec![point.x(), point.y()])
}

impl HereResult {
    /// Features for the requested layers, in the order given
    pub fn to_geojson<P: NetworkProvider + ?Sized>(
        &self,
        provider: &P,
        layers: &[Layer],
    ) -> FeatureCollection {
        let mut features = Vec::new();

        for &layer in layers {
            match layer {
                Layer::Here => {
                    features.push(feature(layer, Value::Point(self.center.to_vec()), self.radius_m));
                }
                Layer::Link => {
                    for polyline in &self.polylines {
                        let line: Vec<Vec<f64>> = polyline
                            .nodes
                            .iter()
                            .filter_map(|id| provider.node(*id))
                            .filter_map(|node| position(node.location))
                            .collect();
                        if line.len() > 1 {
                            features.push(feature(layer, Value::LineString(line), polyline.volume));
                        }
                    }
                }
                Layer::Node => {
                    for (id, volume) in &self.node_volume {
                        if let Some(point) = provider.node(*id).and_then(|n| position(n.location)) {
                            features.push(feature(layer, Value::Point(point), *volume));
                        }
                    }
                }
                Layer::Place => {
                    for id in &self.served_places {
                        if let Some(place) = provider.place(*id) {
                            if let Some(point) = position(place.location) {
                                features.push(feature(layer, Value::Point(point), place.population));
                            }
                        }
                    }
                }
            }
        }

        FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }
}
