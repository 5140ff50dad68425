//! Outbound interchange encoder.
//!
//! One call builds one complete interchange: a single ISA envelope, a
//! single GS group and a single ST transaction set wrapping the per-type
//! body segments. Batching multiple transaction sets per interchange is
//! not supported.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use wms_edi_model::{ItemRow, MessageType, OrderRow, PayloadRows, SEGMENT_SEPARATOR, StockRow};

use crate::control::{ControlNumberSource, SequentialControlNumbers};
use crate::{Error, Result};

/// Partner identities stamped into the envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderConfig {
    pub sender_id: String,
    pub receiver_id: String,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            sender_id: "WMS".to_string(),
            receiver_id: "ERP".to_string(),
        }
    }
}

/// Interchange builder.
pub struct Encoder {
    config: EncoderConfig,
    controls: Arc<dyn ControlNumberSource>,
    timestamp: Option<DateTime<Utc>>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::with_config(EncoderConfig::default())
    }

    pub fn with_config(config: EncoderConfig) -> Self {
        Self {
            config,
            controls: Arc::new(SequentialControlNumbers::new()),
            timestamp: None,
        }
    }

    /// Inject a control-number source (shared across encoders if desired).
    pub fn with_control_source(mut self, controls: Arc<dyn ControlNumberSource>) -> Self {
        self.controls = controls;
        self
    }

    /// Pin the envelope timestamp; defaults to the current UTC time.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Build the interchange text for a message type from payload rows.
    ///
    /// An empty row list yields a minimal, structurally valid interchange.
    /// The only error condition is a payload from the wrong flow for the
    /// requested message type.
    pub fn encode(&self, message_type: MessageType, payload: &PayloadRows) -> Result<String> {
        let now = self.timestamp.unwrap_or_else(Utc::now);
        let date_short = now.format("%y%m%d").to_string();
        let date_full = now.format("%Y%m%d").to_string();
        let time = now.format("%H%M").to_string();
        let control = self.controls.next();

        let mut segments = Vec::new();
        segments.push(format!(
            "ISA*00*          *00*          *ZZ*{:<14}*ZZ*{:<14}*{}*{}*U*00401*{}*0*P*>",
            self.config.sender_id, self.config.receiver_id, date_short, time, control
        ));
        segments.push(format!(
            "GS*{}*{}*{}*{}*{}*{}*X*004010",
            message_type.as_code(),
            self.config.sender_id,
            self.config.receiver_id,
            date_full,
            time,
            control
        ));
        segments.push(format!("ST*{}*{}", message_type.as_code(), control));

        match (message_type, payload) {
            (MessageType::X850, PayloadRows::Orders(rows)) => {
                push_850(&mut segments, rows, &date_full);
            }
            (MessageType::X855, PayloadRows::Orders(rows)) => {
                push_855(&mut segments, rows, &date_full);
            }
            (MessageType::X856, PayloadRows::Orders(rows)) => {
                push_856(&mut segments, rows, &date_full, &time);
            }
            (MessageType::X832, PayloadRows::Items(rows)) => push_832(&mut segments, rows),
            (MessageType::X846, PayloadRows::Stock(rows)) => push_846(&mut segments, rows),
            (MessageType::X940, PayloadRows::Orders(rows)) => {
                push_940(&mut segments, rows, &date_full);
            }
            (MessageType::X945, PayloadRows::Orders(rows)) => {
                push_945(&mut segments, rows, &date_full);
            }
            _ => {
                return Err(Error::PayloadMismatch {
                    message_type: message_type.as_code().to_string(),
                    flow: payload.flow().as_str().to_string(),
                });
            }
        }

        if message_type.has_ctt_trailer() {
            segments.push(format!("CTT*{}", payload.len()));
        }

        // SE counts every segment emitted so far plus itself.
        segments.push(format!("SE*{}*{}", segments.len() + 1, control));
        segments.push(format!("GE*1*{control}"));
        segments.push(format!("IEA*1*{control}"));

        let mut text = segments.join(&SEGMENT_SEPARATOR.to_string());
        text.push(SEGMENT_SEPARATOR);
        Ok(text)
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

fn push_850(segments: &mut Vec<String>, rows: &[OrderRow], date_full: &str) {
    for (index, row) in rows.iter().enumerate() {
        segments.push(format!("BEG*00*SA*{}**{}", row.order_number, date_full));
        segments.push(format!("REF*PO*{}", opt_str(row.reference.as_deref())));
        segments.push("N1*ST*WMS".to_string());
        // Warehouse orders carry no unit price; the PO1 price slot stays empty.
        segments.push(format!(
            "PO1*{}*{}*EA***VP*{}",
            index + 1,
            rows_or_one(row.total_rows),
            row.order_number
        ));
        segments.push(format!("PID*F****{}", row.description));
    }
}

fn push_855(segments: &mut Vec<String>, rows: &[OrderRow], date_full: &str) {
    for (index, row) in rows.iter().enumerate() {
        segments.push(format!("BAK*00*AD*{}*{}", row.order_number, date_full));
        segments.push(format!("REF*PO*{}", opt_str(row.reference.as_deref())));
        segments.push("N1*ST*WMS".to_string());
        segments.push(format!("PO1*{}*{}*EA", index + 1, rows_or_one(row.total_rows)));
    }
}

fn push_856(segments: &mut Vec<String>, rows: &[OrderRow], date_full: &str, time: &str) {
    for (index, row) in rows.iter().enumerate() {
        segments.push(format!("BSN*00*{}*{}*{}", row.order_number, date_full, time));
        segments.push(format!("HL*{}**S", index + 1));
        segments.push(format!("TD1*CTN*{}", rows_or_one(row.total_rows)));
        segments.push(format!("REF*PO*{}", opt_str(row.reference.as_deref())));
        segments.push(format!("MAN*CP*{}", row.order_number));
    }
}

fn push_832(segments: &mut Vec<String>, rows: &[ItemRow]) {
    for (index, item) in rows.iter().enumerate() {
        segments.push(format!("LIN*{}*VP*{}", index + 1, item.code));
        segments.push(format!("PID*F****{}", item.description));
        if let Some(barcode) = item.barcode.as_deref().filter(|value| !value.is_empty()) {
            segments.push(format!("LIN*{}*EN*{}", index + 1, barcode));
        }
    }
}

fn push_846(segments: &mut Vec<String>, rows: &[StockRow]) {
    for (index, row) in rows.iter().enumerate() {
        segments.push(format!("LIN*{}*VP*{}", index + 1, row.item_code));
        segments.push(format!("QTY*33*{}", row.quantity));
        if let Some(lot) = row.lot.as_deref().filter(|value| !value.is_empty()) {
            segments.push(format!("REF*LT*{lot}"));
        }
    }
}

fn push_940(segments: &mut Vec<String>, rows: &[OrderRow], date_full: &str) {
    for (index, row) in rows.iter().enumerate() {
        segments.push(format!(
            "W05*{}*{}",
            row.order_number,
            opt_str(row.reference.as_deref())
        ));
        segments.push("N1*WH*WMS".to_string());
        segments.push(format!("G62*11*{date_full}"));
        segments.push(format!(
            "W01*{}*EA*{}",
            row.total_rows,
            opt_i64(row.order_type)
        ));
        segments.push(format!("LX*{}", index + 1));
    }
}

fn push_945(segments: &mut Vec<String>, rows: &[OrderRow], date_full: &str) {
    for (index, row) in rows.iter().enumerate() {
        segments.push(format!(
            "W06*{}*{}",
            row.order_number,
            opt_str(row.reference.as_deref())
        ));
        segments.push("N1*ST*WMS".to_string());
        segments.push(format!("G62*11*{date_full}"));
        segments.push(format!("W12*{}*EA", row.total_rows));
        segments.push(format!("LX*{}", index + 1));
    }
}

// A zero row count still books one physical line on order-header messages.
fn rows_or_one(total_rows: i64) -> i64 {
    if total_rows == 0 { 1 } else { total_rows }
}

fn opt_str(value: Option<&str>) -> &str {
    value.unwrap_or("")
}

fn opt_i64(value: Option<i64>) -> String {
    value.map(|number| number.to_string()).unwrap_or_default()
}
