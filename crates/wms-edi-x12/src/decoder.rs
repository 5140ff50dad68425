//! Inbound interchange decoder.
//!
//! Decoding is best-effort and never fails: envelope segments that are
//! missing and segments that cannot be interpreted each append a warning
//! to the result, and order reconstruction continues with whatever is
//! readable. Rejecting an unusable decode is the applier's call.

use std::collections::HashSet;

use tracing::warn;

use wms_edi_model::{
    DecodedInterchange, DecodedLine, DecodedOrder, MAX_ORDER_NUMBERS, MAX_ORDERS, RawSegment,
    SEGMENT_SEPARATOR, Segment,
};

/// Decode raw interchange text into the structured order model.
pub fn decode(raw: &str) -> DecodedInterchange {
    let raw_segments: Vec<RawSegment> = raw
        .split(SEGMENT_SEPARATOR)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(RawSegment::parse)
        .collect();

    let mut warnings = Vec::new();
    let mut segments = Vec::with_capacity(raw_segments.len());
    for (index, raw_segment) in raw_segments.iter().enumerate() {
        match Segment::from_raw(raw_segment, index) {
            Ok(segment) => segments.push(segment),
            Err(error) => {
                warn!(segment = raw_segment.tag(), index, %error, "skipping malformed segment");
                warnings.push(error.to_string());
            }
        }
    }

    let mut errors = envelope_errors(&segments);
    errors.append(&mut warnings);

    let message_type = segments.iter().find_map(|segment| match segment {
        Segment::St { message_type, .. } if !message_type.is_empty() => {
            Some(message_type.clone())
        }
        _ => None,
    });

    let (orders, order_numbers) = scan_orders(&segments, message_type.as_deref());

    DecodedInterchange {
        message_type,
        segment_count: raw_segments.len(),
        errors,
        order_numbers,
        orders,
    }
}

fn envelope_errors(segments: &[Segment]) -> Vec<String> {
    let mut errors = Vec::new();
    if !segments.iter().any(|s| matches!(s, Segment::Isa)) {
        errors.push("Missing ISA segment".to_string());
    }
    if !segments.iter().any(|s| matches!(s, Segment::Gs)) {
        errors.push("Missing GS segment".to_string());
    }
    if !segments.iter().any(|s| matches!(s, Segment::St { .. })) {
        errors.push("Missing ST segment".to_string());
    }
    if !segments.iter().any(|s| matches!(s, Segment::Se)) {
        errors.push("Missing SE segment".to_string());
    }
    errors
}

/// Single left-to-right scan: an opening tag flushes the current order and
/// starts a new one, line tags append to it, QTY*33 retouches the last line.
fn scan_orders(
    segments: &[Segment],
    message_type: Option<&str>,
) -> (Vec<DecodedOrder>, Vec<String>) {
    let mut orders: Vec<DecodedOrder> = Vec::new();
    let mut current: Option<DecodedOrder> = None;
    let mut raw_numbers: Vec<String> = Vec::new();

    let open = |current: &mut Option<DecodedOrder>,
                orders: &mut Vec<DecodedOrder>,
                raw_numbers: &mut Vec<String>,
                order_number: &str,
                reference: &str,
                order_date: &str| {
        if let Some(previous) = current.take() {
            orders.push(previous);
        }
        if !order_number.is_empty() {
            raw_numbers.push(order_number.to_string());
        }
        *current = Some(DecodedOrder::open(
            message_type.map(str::to_string),
            order_number,
            reference,
            order_date,
        ));
    };

    for segment in segments {
        match segment {
            Segment::Beg {
                order_number,
                order_date,
            }
            | Segment::Bak {
                order_number,
                order_date,
            }
            | Segment::Bsn {
                order_number,
                order_date,
            } => {
                open(
                    &mut current,
                    &mut orders,
                    &mut raw_numbers,
                    order_number,
                    "",
                    order_date,
                );
            }
            Segment::W05 {
                order_number,
                reference,
            }
            | Segment::W06 {
                order_number,
                reference,
            } => {
                open(
                    &mut current,
                    &mut orders,
                    &mut raw_numbers,
                    order_number,
                    reference,
                    "",
                );
            }
            Segment::Ref { qualifier, value } => {
                if qualifier == "PO" {
                    if let Some(order) = current.as_mut() {
                        // The opening segment wins; REF*PO only fills a gap.
                        if order.reference.is_empty() {
                            order.reference = value.clone();
                        }
                    }
                }
            }
            Segment::Po1 {
                line,
                quantity,
                uom,
                price,
                item_code,
            } => {
                if let Some(order) = current.as_mut() {
                    order.lines.push(DecodedLine {
                        line: line.clone(),
                        item_code: non_empty(item_code),
                        quantity: *quantity,
                        uom: non_empty(uom),
                        price: *price,
                        barcode: None,
                    });
                }
            }
            Segment::W01 {
                line,
                quantity,
                uom,
                item_code,
            } => {
                if let Some(order) = current.as_mut() {
                    order.lines.push(DecodedLine {
                        line: line.clone(),
                        item_code: non_empty(item_code),
                        quantity: *quantity,
                        uom: non_empty(uom),
                        price: None,
                        barcode: None,
                    });
                }
            }
            Segment::W12 {
                line,
                quantity,
                uom,
            } => {
                if let Some(order) = current.as_mut() {
                    order.lines.push(DecodedLine {
                        line: line.clone(),
                        item_code: None,
                        quantity: *quantity,
                        uom: non_empty(uom),
                        price: None,
                        barcode: None,
                    });
                }
            }
            Segment::Lin {
                line,
                item_code,
                barcode,
            } => {
                if let Some(order) = current.as_mut() {
                    order.lines.push(DecodedLine {
                        line: line.clone(),
                        item_code: item_code.clone(),
                        quantity: None,
                        uom: None,
                        price: None,
                        barcode: barcode.clone(),
                    });
                }
            }
            Segment::Qty {
                qualifier,
                quantity,
            } => {
                if qualifier == "33" {
                    if let Some(last) = current.as_mut().and_then(|order| order.lines.last_mut()) {
                        last.quantity = Some(quantity.unwrap_or(0.0));
                    }
                }
            }
            _ => {}
        }
    }

    if let Some(order) = current.take() {
        orders.push(order);
    }
    orders.truncate(MAX_ORDERS);

    let mut seen = HashSet::new();
    let mut order_numbers: Vec<String> = raw_numbers
        .into_iter()
        .filter(|number| seen.insert(number.clone()))
        .collect();
    order_numbers.truncate(MAX_ORDER_NUMBERS);

    (orders, order_numbers)
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
