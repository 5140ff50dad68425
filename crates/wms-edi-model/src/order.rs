//! Decoded interchange, order and line model.
//!
//! These types are built incrementally by the decoder's left-to-right scan,
//! persisted as JSON on the inbox record, and consumed exactly once by the
//! apply orchestrator.

use serde::{Deserialize, Serialize};

/// Cap on the convenience order-number list (silent truncation).
pub const MAX_ORDER_NUMBERS: usize = 25;
/// Cap on decoded orders per interchange (silent truncation).
pub const MAX_ORDERS: usize = 50;

/// One decoded order line.
///
/// Field presence depends on the producing segment family: PO1 carries
/// quantity/uom/price, W01 quantity/uom/item code, W12 only quantity/uom,
/// LIN item code/barcode with the quantity filled in by a following QTY.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DecodedLine {
    pub line: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uom: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
}

/// One decoded order, opened by a BEG/BAK/BSN/W05/W06 segment.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DecodedOrder {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
    pub order_number: String,
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub order_date: String,
    #[serde(default)]
    pub lines: Vec<DecodedLine>,
}

impl DecodedOrder {
    /// Start an order from its opening-segment fields.
    pub fn open(
        message_type: Option<String>,
        order_number: impl Into<String>,
        reference: impl Into<String>,
        order_date: impl Into<String>,
    ) -> Self {
        Self {
            message_type,
            order_number: order_number.into(),
            reference: reference.into(),
            order_date: order_date.into(),
            lines: Vec::new(),
        }
    }
}

/// Best-effort decode result for one interchange.
///
/// Structural problems are accumulated in `errors`; the decoder never
/// fails outright. An interchange without order-opening segments (832/846)
/// legitimately has an empty `orders` list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DecodedInterchange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
    pub segment_count: usize,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub order_numbers: Vec<String>,
    #[serde(default)]
    pub orders: Vec<DecodedOrder>,
}

impl DecodedInterchange {
    /// True when at least one order carries at least one line.
    pub fn has_applicable_orders(&self) -> bool {
        self.orders.iter().any(|order| !order.lines.is_empty())
    }
}
