//! Outbound payload row shapes per flow.
//!
//! These mirror what the storage loaders return for each outbound flow and
//! are the only input the encoder needs besides the message type.

use serde::{Deserialize, Serialize};

use crate::Flow;

/// One catalog item row (items flow, 832).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ItemRow {
    pub id: i64,
    pub code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_of_measure: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

/// One stock position row (stock flow, 846).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StockRow {
    pub item_id: i64,
    pub item_code: String,
    #[serde(default)]
    pub item_description: String,
    pub quantity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loading_unit_id: Option<i64>,
}

/// One open warehouse order row (orders flow, 850/855/856/940/945).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OrderRow {
    pub id: i64,
    pub order_number: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_type: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(default)]
    pub total_rows: i64,
}

/// Payload rows for one outbound build, tagged by flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "flow", content = "rows", rename_all = "lowercase")]
pub enum PayloadRows {
    Items(Vec<ItemRow>),
    Stock(Vec<StockRow>),
    Orders(Vec<OrderRow>),
}

impl PayloadRows {
    /// The flow this payload came from.
    pub fn flow(&self) -> Flow {
        match self {
            PayloadRows::Items(_) => Flow::Items,
            PayloadRows::Stock(_) => Flow::Stock,
            PayloadRows::Orders(_) => Flow::Orders,
        }
    }

    /// Number of rows in the payload.
    pub fn len(&self) -> usize {
        match self {
            PayloadRows::Items(rows) => rows.len(),
            PayloadRows::Stock(rows) => rows.len(),
            PayloadRows::Orders(rows) => rows.len(),
        }
    }

    /// True when there are no rows to emit.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
