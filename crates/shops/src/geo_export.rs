use geojson::{Feature, FeatureCollection, Geometry, Value};

use crate::overpass::Shop;

/// Shops as GeoJSON points (`[lng, lat]`) for map widgets
pub fn shops_to_geojson(shops: &[Shop]) -> FeatureCollection {
    let features = shops
        .iter()
        .enumerate()
        .map(|(i, shop)| {
            let geometry = Geometry::new(Value::Point(vec![shop.lng, shop.lat]));

            let mut properties = serde_json::Map::new();
            properties.insert("name".to_string(), serde_json::Value::String(shop.name.clone()));
            properties.insert("address".to_string(), serde_json::Value::String(shop.address.clone()));

            Feature {
                bbox: None,
                geometry: Some(geometry),
                id: Some(geojson::feature::Id::Number(serde_json::Number::from(i))),
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
