use serde::{Deserialize, Serialize};

use super::Coordinate;

pub const UNKNOWN_LOCATION: &str = "Unknown location";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaceCandidate {
    pub display_name: String,
    pub coordinate: Coordinate,
}

/// Structured address fields as geocoders report them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressProperties {
    pub name: Option<String>,
    pub street: Option<String>,
    pub housenumber: Option<String>,
    pub city: Option<String>,
    pub town: Option<String>,
    pub village: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

impl AddressProperties {
    /// Joins name, street (with house number), locality, state and
    /// country with ", ". Locality is the first of city, town, village.
    pub fn display_name(&self) -> String {
        let mut parts: Vec<String> = vec![];

        if let Some(name) = present(&self.name) {
            parts.push(name.into());
        }

        match (present(&self.street), present(&self.housenumber)) {
            (Some(street), Some(number)) => parts.push(format!("{} {}", street, number)),
            (Some(street), None) => parts.push(street.into()),
            (None, Some(number)) => parts.push(number.into()),
            (None, None) => {}
        }

        let locality = present(&self.city)
            .or_else(|| present(&self.town))
            .or_else(|| present(&self.village));
        if let Some(locality) = locality {
            parts.push(locality.into());
        }

        if let Some(state) = present(&self.state) {
            parts.push(state.into());
        }

        if let Some(country) = present(&self.country) {
            parts.push(country.into());
        }

        if parts.is_empty() {
            return UNKNOWN_LOCATION.into();
        }

        parts.join(", ")
    }
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
fn props(pairs: &[(&str, &str)]) -> AddressProperties {
    let value = serde_json::Value::Object(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
            .collect(),
    );
    serde_json::from_value(value).unwrap()
}

#[test]
fn full_address() {
    let p = props(&[
        ("name", "Acme"),
        ("street", "Main St"),
        ("housenumber", "12"),
        ("city", "Springfield"),
        ("country", "X"),
    ]);

    assert_eq!(p.display_name(), "Acme, Main St 12, Springfield, X");
}

#[test]
fn locality_falls_back_to_town_then_village() {
    let p = props(&[("name", "Depot"), ("town", "Tenali"), ("village", "Nambur")]);
    assert_eq!(p.display_name(), "Depot, Tenali");

    let p = props(&[("name", "Depot"), ("village", "Nambur"), ("state", "AP")]);
    assert_eq!(p.display_name(), "Depot, Nambur, AP");

    let p = props(&[("city", "Guntur"), ("town", "Tenali")]);
    assert_eq!(p.display_name(), "Guntur");
}

#[test]
fn housenumber_without_street_stands_alone() {
    let p = props(&[("name", "Acme"), ("housenumber", "12"), ("country", "X")]);
    assert_eq!(p.display_name(), "Acme, 12, X");

    let p = props(&[("housenumber", "12")]);
    assert_eq!(p.display_name(), "12");
}

#[test]
fn street_inside_name_is_left_alone() {
    let p = props(&[("name", "Main St Diner"), ("street", "Main St"), ("housenumber", "4")]);
    assert_eq!(p.display_name(), "Main St Diner, Main St 4");
}

#[test]
fn empty_properties_are_unknown() {
    assert_eq!(AddressProperties::default().display_name(), UNKNOWN_LOCATION);
    assert_eq!(props(&[("name", "  ")]).display_name(), UNKNOWN_LOCATION);
}
