//! Raw and typed segment representations.
//!
//! A raw segment is the positional `*`-separated token list as found on the
//! wire. Typed segments give each recognized tag named, validated fields so
//! that a malformed segment fails loudly where it occurs instead of silently
//! yielding wrong values from a fixed index.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Record separator between segments.
pub const SEGMENT_SEPARATOR: char = '~';
/// Element separator between fields within a segment.
pub const ELEMENT_SEPARATOR: char = '*';

/// One tagged, positional segment as split from the interchange text.
///
/// Element 0 is the tag itself, matching the wire positions the encoder
/// uses, so `field(3)` on `BEG*00*SA*PO-1**20240105` is `PO-1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSegment {
    elements: Vec<String>,
}

impl RawSegment {
    /// Split one `~`-delimited token into its elements.
    pub fn parse(token: &str) -> Self {
        Self {
            elements: token.split(ELEMENT_SEPARATOR).map(str::to_string).collect(),
        }
    }

    /// Segment tag (element 0).
    pub fn tag(&self) -> &str {
        self.elements.first().map_or("", String::as_str)
    }

    /// Field at a wire position, empty string when absent.
    pub fn field(&self, index: usize) -> &str {
        self.elements.get(index).map_or("", String::as_str)
    }

    /// Owned copy of a field.
    pub fn owned_field(&self, index: usize) -> String {
        self.field(index).to_string()
    }

    /// Field at a position, `None` when absent or empty.
    pub fn field_opt(&self, index: usize) -> Option<String> {
        let value = self.field(index);
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }

    /// The field immediately following a literal marker token (`VP`, `EN`).
    pub fn marker_value(&self, marker: &str) -> Option<String> {
        let position = self.elements.iter().position(|field| field == marker)?;
        self.field_opt(position + 1)
    }

    /// Number of elements including the tag.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// True when the segment has no elements at all.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    fn numeric_field(&self, position: usize, segment_index: usize) -> Result<Option<f64>> {
        match self.field_opt(position) {
            None => Ok(None),
            Some(value) => value.parse::<f64>().map(Some).map_err(|_| {
                Error::malformed(
                    self.tag(),
                    segment_index,
                    format!("non-numeric value '{value}' at field {position}"),
                )
            }),
        }
    }
}

/// A recognized segment with named fields.
///
/// Field positions mirror the encoder's emission exactly; see the per-tag
/// constructors in [`Segment::from_raw`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Segment {
    Isa,
    Gs,
    St {
        message_type: String,
        control: String,
    },
    Se,
    Ge,
    Iea,
    /// 850 order header: `BEG*00*SA*<orderNumber>**<date>`.
    Beg {
        order_number: String,
        order_date: String,
    },
    /// 855 acknowledgment header: `BAK*00*AD*<orderNumber>*<date>`.
    Bak {
        order_number: String,
        order_date: String,
    },
    /// 856 shipment header: `BSN*00*<orderNumber>*<date>*<time>`.
    Bsn {
        order_number: String,
        order_date: String,
    },
    /// 940 header: `W05*<orderNumber>*<reference>`.
    W05 {
        order_number: String,
        reference: String,
    },
    /// 945 header: `W06*<orderNumber>*<reference>`.
    W06 {
        order_number: String,
        reference: String,
    },
    Ref {
        qualifier: String,
        value: String,
    },
    /// 850/855 line: `PO1*<line>*<qty>*<uom>*<price>**VP*<itemCode>`.
    Po1 {
        line: String,
        quantity: Option<f64>,
        uom: String,
        price: Option<f64>,
        item_code: String,
    },
    /// 940 line: `W01*<qty>*<uom>*<itemCode>` (line number doubles as qty).
    W01 {
        line: String,
        quantity: Option<f64>,
        uom: String,
        item_code: String,
    },
    /// 945 line: `W12*<qty>*<uom>`.
    W12 {
        line: String,
        quantity: Option<f64>,
        uom: String,
    },
    /// Catalog/inventory line: item code after `VP`, barcode after `EN`.
    Lin {
        line: String,
        item_code: Option<String>,
        barcode: Option<String>,
    },
    Qty {
        qualifier: String,
        quantity: Option<f64>,
    },
    /// Any tag the decoder does not interpret (N1, PID, G62, LX, CTT, ...).
    Other {
        tag: String,
    },
}

impl Segment {
    /// Interpret a raw segment at the given position in the interchange.
    ///
    /// Unknown tags become [`Segment::Other`]. Recognized tags with fields
    /// that cannot be read (non-numeric quantity or price) return a
    /// malformed-segment error carrying the tag and position.
    pub fn from_raw(raw: &RawSegment, index: usize) -> Result<Segment> {
        let segment = match raw.tag() {
            "ISA" => Segment::Isa,
            "GS" => Segment::Gs,
            "ST" => Segment::St {
                message_type: raw.owned_field(1),
                control: raw.owned_field(2),
            },
            "SE" => Segment::Se,
            "GE" => Segment::Ge,
            "IEA" => Segment::Iea,
            "BEG" => Segment::Beg {
                order_number: raw.owned_field(3),
                order_date: raw.owned_field(5),
            },
            "BAK" => Segment::Bak {
                order_number: raw.owned_field(3),
                order_date: raw.owned_field(4),
            },
            "BSN" => Segment::Bsn {
                order_number: raw.owned_field(2),
                order_date: raw.owned_field(3),
            },
            "W05" => Segment::W05 {
                order_number: raw.owned_field(1),
                reference: raw.owned_field(2),
            },
            "W06" => Segment::W06 {
                order_number: raw.owned_field(1),
                reference: raw.owned_field(2),
            },
            "REF" => Segment::Ref {
                qualifier: raw.owned_field(1),
                value: raw.owned_field(2),
            },
            "PO1" => Segment::Po1 {
                line: raw.owned_field(1),
                quantity: raw.numeric_field(2, index)?,
                uom: raw.owned_field(3),
                price: raw.numeric_field(4, index)?,
                item_code: raw.owned_field(7),
            },
            "W01" => Segment::W01 {
                line: raw.owned_field(1),
                quantity: raw.numeric_field(1, index)?,
                uom: raw.owned_field(2),
                item_code: raw.owned_field(3),
            },
            "W12" => Segment::W12 {
                line: raw.owned_field(1),
                quantity: raw.numeric_field(1, index)?,
                uom: raw.owned_field(2),
            },
            "LIN" => Segment::Lin {
                line: raw.owned_field(1),
                item_code: raw.marker_value("VP"),
                barcode: raw.marker_value("EN"),
            },
            "QTY" => Segment::Qty {
                qualifier: raw.owned_field(1),
                quantity: raw.numeric_field(2, index)?,
            },
            other => Segment::Other {
                tag: other.to_string(),
            },
        };

        Ok(segment)
    }

    /// True for the tags that open a new order (BEG/BAK/BSN/W05/W06).
    pub fn opens_order(&self) -> bool {
        matches!(
            self,
            Segment::Beg { .. }
                | Segment::Bak { .. }
                | Segment::Bsn { .. }
                | Segment::W05 { .. }
                | Segment::W06 { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_segment_positions() {
        let raw = RawSegment::parse("BEG*00*SA*PO-100**20240105");
        assert_eq!(raw.tag(), "BEG");
        assert_eq!(raw.field(1), "00");
        assert_eq!(raw.field(3), "PO-100");
        assert_eq!(raw.field(4), "");
        assert_eq!(raw.field(5), "20240105");
        assert_eq!(raw.field(9), "");
    }

    #[test]
    fn test_marker_value_lookup() {
        let raw = RawSegment::parse("LIN*1*VP*ART-9*EN*8001234567890");
        assert_eq!(raw.marker_value("VP").as_deref(), Some("ART-9"));
        assert_eq!(raw.marker_value("EN").as_deref(), Some("8001234567890"));
        assert_eq!(raw.marker_value("UK"), None);
    }

    #[test]
    fn test_beg_fields() {
        let raw = RawSegment::parse("BEG*00*SA*PO-100**20240105");
        let segment = Segment::from_raw(&raw, 3).unwrap();
        assert_eq!(
            segment,
            Segment::Beg {
                order_number: "PO-100".to_string(),
                order_date: "20240105".to_string(),
            }
        );
        assert!(segment.opens_order());
    }

    #[test]
    fn test_w05_fields() {
        let raw = RawSegment::parse("W05*ORD-7*RIF-7");
        let segment = Segment::from_raw(&raw, 3).unwrap();
        assert_eq!(
            segment,
            Segment::W05 {
                order_number: "ORD-7".to_string(),
                reference: "RIF-7".to_string(),
            }
        );
    }

    #[test]
    fn test_po1_numeric_fields() {
        let raw = RawSegment::parse("PO1*1*5*EA*12.5**VP*ART-1");
        let segment = Segment::from_raw(&raw, 6).unwrap();
        match segment {
            Segment::Po1 {
                line,
                quantity,
                uom,
                price,
                item_code,
            } => {
                assert_eq!(line, "1");
                assert_eq!(quantity, Some(5.0));
                assert_eq!(uom, "EA");
                assert_eq!(price, Some(12.5));
                assert_eq!(item_code, "ART-1");
            }
            other => panic!("expected PO1, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_quantity_is_loud() {
        let raw = RawSegment::parse("QTY*33*abc");
        let err = Segment::from_raw(&raw, 8).unwrap_err();
        match err {
            Error::MalformedSegment { tag, index, reason } => {
                assert_eq!(tag, "QTY");
                assert_eq!(index, 8);
                assert!(reason.contains("abc"));
            }
            other => panic!("expected malformed-segment error, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_tag_passes_through() {
        let raw = RawSegment::parse("PID*F****Widget");
        let segment = Segment::from_raw(&raw, 5).unwrap();
        assert_eq!(
            segment,
            Segment::Other {
                tag: "PID".to_string()
            }
        );
        assert!(!segment.opens_order());
    }

    #[test]
    fn test_lin_without_markers() {
        let raw = RawSegment::parse("LIN*2");
        let segment = Segment::from_raw(&raw, 4).unwrap();
        assert_eq!(
            segment,
            Segment::Lin {
                line: "2".to_string(),
                item_code: None,
                barcode: None,
            }
        );
    }
}
