//! Tagged source records attached to a backend answer.
//!
//! Sources arrive as loosely-shaped JSON. Each record is adapted on its own;
//! anything unrecognized becomes [`Source::Unknown`] instead of failing the
//! whole reply.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::graph::number_from;

/// A citation rendered under an assistant answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

/// A recommended provider shown in the solution panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorCard {
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub description: String,
}

impl VendorCard {
    /// Entry shown when no provider has been recommended yet.
    pub fn placeholder() -> Self {
        Self {
            title: "No providers yet".to_string(),
            category: String::new(),
            price: String::new(),
            tags: Vec::new(),
            description: "Ask for a specialist to see recommended providers.".to_string(),
        }
    }
}

/// Embedded analytic payload of a `graph_data` source, still unparsed.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphSource {
    pub payload: Value,
}

/// One backend source, discriminated by its `type` field.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Content(Citation),
    GraphData(GraphSource),
    VendorCard(VendorCard),
    Unknown,
}

impl Source {
    /// Adapt one raw source record.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::Unknown;
        };

        let kind = str_field(obj, &["type", "source_type", "kind"])
            .unwrap_or_default()
            .to_ascii_lowercase();

        match kind.as_str() {
            "content" | "citation" | "document" => citation(obj).map_or(Self::Unknown, Self::Content),
            "graph_data" | "graph" => graph(obj).map_or(Self::Unknown, Self::GraphData),
            "vendor_card" | "vendor" => vendor(obj).map_or(Self::Unknown, Self::VendorCard),
            _ => Self::Unknown,
        }
    }

    /// Adapt a list of raw records, keeping order.
    pub fn from_values(values: &[Value]) -> Vec<Self> {
        values.iter().map(Self::from_value).collect()
    }
}

fn citation(obj: &Map<String, Value>) -> Option<Citation> {
    let name = str_field(obj, &["name", "title", "source", "document"])?;
    let url = str_field(obj, &["url", "link"]);
    let page = ["page", "page_number"]
        .iter()
        .filter_map(|key| obj.get(*key))
        .find_map(number_from)
        .filter(|n| *n >= 0.0)
        .map(|n| n as u32);

    Some(Citation { name, url, page })
}

fn graph(obj: &Map<String, Value>) -> Option<GraphSource> {
    ["gap_solved", "payload", "data"]
        .iter()
        .find_map(|key| obj.get(*key))
        .filter(|v| !v.is_null())
        .map(|payload| GraphSource {
            payload: payload.clone(),
        })
}

fn vendor(obj: &Map<String, Value>) -> Option<VendorCard> {
    let title = str_field(obj, &["title", "name"])?;

    let price = match obj.get("price") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };

    let tags = match obj.get("tags") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };

    Some(VendorCard {
        title,
        category: str_field(obj, &["category"]).unwrap_or_default(),
        price,
        tags,
        description: str_field(obj, &["description", "summary"]).unwrap_or_default(),
    })
}

/// First non-empty string among `keys`.
fn str_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| obj.get(*key))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}
