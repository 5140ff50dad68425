//! Inbound interchange ingest.

use tracing::info;

use wms_edi_model::{DecodedInterchange, Flow};
use wms_edi_store::Store;

use crate::Result;

/// Outcome of one ingest: the persisted inbox id and the decode preview.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutcome {
    pub inbox_id: i64,
    pub decoded: DecodedInterchange,
}

/// Persists raw partner interchanges and their decoded form.
#[derive(Clone)]
pub struct InboxService {
    store: Store,
}

impl InboxService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Decode the content, store raw and decoded forms on a new inbox
    /// record, and log the attempt. Decoding is best-effort: structural
    /// warnings ride along on the stored payload, they do not block ingest.
    pub async fn ingest(
        &self,
        integration_key: &str,
        flow: Flow,
        content: &str,
    ) -> Result<IngestOutcome> {
        let decoded = wms_edi_x12::decode(content);
        let parsed_json = serde_json::to_string(&decoded)?;

        let inbox_id = self
            .store
            .insert_inbox(
                integration_key,
                flow.as_str(),
                decoded.message_type.as_deref(),
                content,
                Some(&parsed_json),
            )
            .await?;

        let log_id = self
            .store
            .start_sync_log(integration_key, "inbound", flow.as_str())
            .await?;
        let summary = format!(
            "EDI import {} ({} chars, {} segmenti)",
            decoded.message_type.as_deref().unwrap_or("UNKNOWN"),
            content.len(),
            decoded.segment_count
        );
        self.store
            .finish_sync_log(log_id, "SUCCESS", Some(&summary), None)
            .await?;

        info!(
            integration_key,
            inbox_id,
            message_type = decoded.message_type.as_deref().unwrap_or("UNKNOWN"),
            orders = decoded.orders.len(),
            warnings = decoded.errors.len(),
            "ingested interchange"
        );

        Ok(IngestOutcome { inbox_id, decoded })
    }
}
