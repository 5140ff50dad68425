//! Typed row shapes read from and written to the warehouse schema.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use wms_edi_model::DecodedInterchange;

use crate::{Error, Result};

/// Terminal outcome of one apply attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApplyStatus {
    Success,
    Partial,
    Failed,
}

impl ApplyStatus {
    /// Persisted representation.
    pub fn as_str(self) -> &'static str {
        match self {
            ApplyStatus::Success => "SUCCESS",
            ApplyStatus::Partial => "PARTIAL",
            ApplyStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for ApplyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplyStatus {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "SUCCESS" => Ok(ApplyStatus::Success),
            "PARTIAL" => Ok(ApplyStatus::Partial),
            "FAILED" => Ok(ApplyStatus::Failed),
            other => Err(Error::Query {
                table: "IntegrationEdiInbox".to_string(),
                details: format!("Unknown apply status '{other}'"),
            }),
        }
    }
}

/// Minimal item projection used by lookups and suggestions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSummary {
    pub id: i64,
    pub code: String,
    pub description: Option<String>,
    pub barcode: Option<String>,
}

/// Persisted external-code to item correspondence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemMapping {
    pub id: i64,
    pub integration_key: String,
    pub external_code: String,
    pub item_id: Option<i64>,
    pub item_code: Option<String>,
    pub description: Option<String>,
    pub created_at: String,
}

/// Insert/update shape for an item mapping.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewItemMapping {
    pub integration_key: String,
    pub external_code: String,
    pub item_id: Option<i64>,
    pub item_code: Option<String>,
    pub description: Option<String>,
}

/// Inbox listing projection (no raw or decoded payload).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboxSummary {
    pub id: i64,
    pub integration_key: String,
    pub flow: String,
    pub message_type: Option<String>,
    pub received_at: String,
    pub applied_at: Option<String>,
    pub applied_status: Option<ApplyStatus>,
    pub applied_message: Option<String>,
}

/// Full inbox record including raw content and decoded payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboxRecord {
    pub id: i64,
    pub integration_key: String,
    pub flow: String,
    pub message_type: Option<String>,
    pub raw_content: String,
    pub parsed_json: Option<String>,
    pub received_at: String,
    pub applied_at: Option<String>,
    pub applied_status: Option<ApplyStatus>,
    pub applied_message: Option<String>,
    pub override_tipo_lista: Option<i64>,
    pub override_area_id: Option<i64>,
    pub override_machine_id: Option<i64>,
}

impl InboxRecord {
    /// Deserialize the persisted decoded payload, if any.
    pub fn decoded(&self) -> Result<Option<DecodedInterchange>> {
        match self.parsed_json.as_deref() {
            None => Ok(None),
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
        }
    }
}

/// One rejected order or line, append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyErrorRow {
    pub id: i64,
    pub inbox_id: i64,
    pub order_number: Option<String>,
    pub line_number: Option<String>,
    pub item_code: Option<String>,
    pub reason: String,
    pub created_at: String,
}

/// Insert shape for an apply error.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewApplyError {
    pub order_number: Option<String>,
    pub line_number: Option<String>,
    pub item_code: Option<String>,
    pub reason: String,
}

/// One apply attempt, append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRow {
    pub id: i64,
    pub inbox_id: i64,
    pub applied_by: Option<String>,
    pub applied_at: String,
    pub status: ApplyStatus,
    pub message: Option<String>,
}

/// One sync attempt against a partner, inbound or outbound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncLogRow {
    pub id: i64,
    pub integration_key: String,
    pub direction: String,
    pub flow: String,
    pub status: String,
    pub message: Option<String>,
    pub record_count: Option<i64>,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub duration_ms: Option<i64>,
}

/// Insert shape for a warehouse list header.
#[derive(Debug, Clone, PartialEq)]
pub struct NewList {
    pub num_lista: String,
    pub descrizione: String,
    pub rif_lista: Option<String>,
    pub id_tipo_lista: i64,
    pub priorita: i64,
}

/// Insert shape for one list line.
#[derive(Debug, Clone, PartialEq)]
pub struct NewListRow {
    pub num_riga: String,
    pub id_prodotto: i64,
    pub codice: String,
    pub qta_richiesta: f64,
}

/// List header as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListRecord {
    pub id: i64,
    pub num_lista: String,
    pub descrizione: Option<String>,
    pub rif_lista: Option<String>,
    pub id_tipo_lista: i64,
    pub priorita: i64,
    pub terminata: bool,
}

/// Area/machine association attached to a created list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaDetailRow {
    pub id: i64,
    pub id_lista: i64,
    pub id_area: Option<i64>,
    pub id_macchina: Option<i64>,
}

/// List line as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListRowRecord {
    pub id: i64,
    pub id_lista: i64,
    pub num_riga: Option<String>,
    pub id_prodotto: i64,
    pub codice: Option<String>,
    pub qta_richiesta: f64,
    pub qta_movimentata: f64,
    pub qta_prenotata: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_status_round_trip() {
        for status in [ApplyStatus::Success, ApplyStatus::Partial, ApplyStatus::Failed] {
            assert_eq!(status.as_str().parse::<ApplyStatus>().unwrap(), status);
        }
        assert!("DONE".parse::<ApplyStatus>().is_err());
    }

    #[test]
    fn test_inbox_decoded_payload() {
        let record = InboxRecord {
            id: 1,
            integration_key: "erp".to_string(),
            flow: "orders".to_string(),
            message_type: Some("940".to_string()),
            raw_content: "W05*ORD-1*R~".to_string(),
            parsed_json: Some(
                r#"{"message_type":"940","segment_count":1,"orders":[
                    {"order_number":"ORD-1","lines":[]}]}"#
                    .to_string(),
            ),
            received_at: "2024-01-05T10:00:00Z".to_string(),
            applied_at: None,
            applied_status: None,
            applied_message: None,
            override_tipo_lista: None,
            override_area_id: None,
            override_machine_id: None,
        };

        let decoded = record.decoded().unwrap().unwrap();
        assert_eq!(decoded.orders.len(), 1);
        assert_eq!(decoded.orders[0].order_number, "ORD-1");
    }

    #[test]
    fn test_inbox_without_payload() {
        let record = InboxRecord {
            id: 1,
            integration_key: "erp".to_string(),
            flow: "orders".to_string(),
            message_type: None,
            raw_content: String::new(),
            parsed_json: None,
            received_at: "2024-01-05T10:00:00Z".to_string(),
            applied_at: None,
            applied_status: None,
            applied_message: None,
            override_tipo_lista: None,
            override_area_id: None,
            override_machine_id: None,
        };
        assert!(record.decoded().unwrap().is_none());
    }
}
