//! Apply orchestrator: decoded orders become warehouse lists.
//!
//! One apply pass is a small state machine over an inbox record ending in
//! SUCCESS, PARTIAL or FAILED. Orders and lines fail individually without
//! aborting the batch; every rejection is persisted as an error row and the
//! pass is summarized on the inbox record and in the audit trail.
//!
//! All reads (inbox, type map, item resolution) happen before the single
//! write transaction, so a failure partway through cannot leave created
//! lists without their outcome bookkeeping.

use serde::{Deserialize, Serialize};
use tracing::info;

use wms_edi_model::{DecodedLine, DecodedOrder};
use wms_edi_store::{ApplyStatus, InboxRecord, NewApplyError, NewList, NewListRow, Store};

use crate::resolver::ItemResolver;
use crate::{Error, Result};

/// Operator-facing rejection reasons, as shown in the back office.
pub const REASON_MISSING_ORDER_NUMBER: &str = "Numero ordine mancante";
pub const REASON_NO_LINES: &str = "Nessuna riga ordine";
pub const REASON_MISSING_ITEM_CODE: &str = "Codice articolo mancante";
pub const REASON_INVALID_QUANTITY: &str = "Quantita non valida";
pub const REASON_ITEM_NOT_FOUND: &str = "Articolo non trovato";
/// Fixed message for a payload with nothing applicable.
pub const MESSAGE_NO_ORDERS: &str = "Nessun ordine da applicare";

const DEFAULT_TIPO_LISTA: i64 = 1;
const DEFAULT_PRIORITA: i64 = 1;

/// Apply behavior switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Deliberately re-apply a record that was already applied. Without
    /// this an already-applied record is rejected.
    pub reprocess: bool,
}

/// One list created by an apply pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedList {
    pub list_id: i64,
    pub order_number: String,
}

/// Result of one apply pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyOutcome {
    pub status: ApplyStatus,
    pub message: String,
    pub created: Vec<CreatedList>,
    pub errors: Vec<NewApplyError>,
}

struct PlannedList {
    list: NewList,
    rows: Vec<NewListRow>,
}

/// Applies decoded inbox payloads as warehouse lists.
#[derive(Clone)]
pub struct ApplyService {
    store: Store,
    resolver: ItemResolver,
}

impl ApplyService {
    pub fn new(store: Store) -> Self {
        let resolver = ItemResolver::new(store.clone());
        Self { store, resolver }
    }

    pub fn resolver(&self) -> &ItemResolver {
        &self.resolver
    }

    /// Run one apply pass for an inbox record.
    ///
    /// Returns `Err` only for infrastructure problems or a rejected
    /// re-apply; every data problem ends up in the outcome and the
    /// persisted error rows instead.
    pub async fn apply(
        &self,
        integration_key: &str,
        inbox_id: i64,
        applied_by: &str,
        options: ApplyOptions,
    ) -> Result<ApplyOutcome> {
        let inbox = self
            .store
            .get_inbox(integration_key, inbox_id)
            .await?
            .ok_or_else(|| Error::InboxNotFound {
                integration_key: integration_key.to_string(),
                inbox_id,
            })?;

        if let Some(applied_at) = inbox.applied_at.clone() {
            if !options.reprocess {
                return Err(Error::AlreadyApplied {
                    inbox_id,
                    applied_at,
                });
            }
            info!(inbox_id, %applied_at, "reprocessing an already-applied record");
        }

        let decoded = inbox.decoded()?.unwrap_or_default();

        if !decoded.has_applicable_orders() {
            return self
                .finish_without_orders(inbox_id, applied_by)
                .await;
        }

        let message_type = decoded
            .message_type
            .clone()
            .or_else(|| inbox.message_type.clone());
        let id_tipo_lista = self
            .resolve_tipo_lista(integration_key, &inbox, message_type.as_deref())
            .await?;

        // Plan phase: validate and resolve everything up front.
        let mut planned: Vec<PlannedList> = Vec::new();
        let mut errors: Vec<NewApplyError> = Vec::new();

        for order in &decoded.orders {
            if order.order_number.is_empty() {
                errors.push(NewApplyError {
                    order_number: None,
                    line_number: None,
                    item_code: None,
                    reason: REASON_MISSING_ORDER_NUMBER.to_string(),
                });
                continue;
            }
            if order.lines.is_empty() {
                errors.push(NewApplyError {
                    order_number: Some(order.order_number.clone()),
                    line_number: None,
                    item_code: None,
                    reason: REASON_NO_LINES.to_string(),
                });
                continue;
            }

            let mut rows = Vec::new();
            for line in &order.lines {
                match self
                    .plan_line(integration_key, order, line)
                    .await?
                {
                    Ok(row) => rows.push(row),
                    Err(error) => errors.push(error),
                }
            }

            planned.push(PlannedList {
                list: NewList {
                    num_lista: order.order_number.clone(),
                    descrizione: list_description(message_type.as_deref()),
                    rif_lista: non_empty(&order.reference),
                    id_tipo_lista,
                    priorita: DEFAULT_PRIORITA,
                },
                rows,
            });
        }

        // Write phase: one transaction for lists, lines, error rows and
        // the outcome bookkeeping.
        let tx = self.store.begin().await?;
        let mut created = Vec::new();
        for plan in &planned {
            let list_id = tx.insert_list(&plan.list).await?;
            for row in &plan.rows {
                tx.insert_list_row(list_id, row).await?;
            }
            if inbox.override_area_id.is_some() || inbox.override_machine_id.is_some() {
                tx.insert_area_detail(list_id, inbox.override_area_id, inbox.override_machine_id)
                    .await?;
            }
            created.push(CreatedList {
                list_id,
                order_number: plan.list.num_lista.clone(),
            });
        }
        for error in &errors {
            tx.insert_apply_error(inbox_id, error).await?;
        }

        let status = if created.is_empty() {
            ApplyStatus::Failed
        } else if errors.is_empty() {
            ApplyStatus::Success
        } else {
            ApplyStatus::Partial
        };
        let message = if errors.is_empty() {
            format!("Ordini creati: {}", created.len())
        } else {
            format!("Ordini creati: {}, scarti: {}", created.len(), errors.len())
        };

        tx.mark_inbox_applied(inbox_id, status, &message).await?;
        tx.insert_apply_audit(inbox_id, Some(applied_by), status, &message)
            .await?;
        tx.commit().await?;

        info!(
            integration_key,
            inbox_id,
            %status,
            created = created.len(),
            rejected = errors.len(),
            "apply pass finished"
        );

        Ok(ApplyOutcome {
            status,
            message,
            created,
            errors,
        })
    }

    /// Validate one line and resolve its item; the inner `Result`
    /// distinguishes a plannable row from a recorded rejection.
    async fn plan_line(
        &self,
        integration_key: &str,
        order: &DecodedOrder,
        line: &DecodedLine,
    ) -> Result<std::result::Result<NewListRow, NewApplyError>> {
        let line_number = non_empty(&line.line);

        let Some(item_code) = line.item_code.as_deref().filter(|code| !code.is_empty()) else {
            return Ok(Err(NewApplyError {
                order_number: Some(order.order_number.clone()),
                line_number,
                item_code: None,
                reason: REASON_MISSING_ITEM_CODE.to_string(),
            }));
        };

        let Some(quantity) = line.quantity.filter(|quantity| *quantity > 0.0) else {
            return Ok(Err(NewApplyError {
                order_number: Some(order.order_number.clone()),
                line_number,
                item_code: Some(item_code.to_string()),
                reason: REASON_INVALID_QUANTITY.to_string(),
            }));
        };

        let Some(item_id) = self.resolver.resolve(integration_key, item_code).await? else {
            return Ok(Err(NewApplyError {
                order_number: Some(order.order_number.clone()),
                line_number,
                item_code: Some(item_code.to_string()),
                reason: REASON_ITEM_NOT_FOUND.to_string(),
            }));
        };

        Ok(Ok(NewListRow {
            num_riga: line_number.unwrap_or_else(|| "1".to_string()),
            id_prodotto: item_id,
            codice: item_code.to_string(),
            qta_richiesta: quantity,
        }))
    }

    /// Manual per-record override wins, then the per-integration type map,
    /// then the default list type.
    async fn resolve_tipo_lista(
        &self,
        integration_key: &str,
        inbox: &InboxRecord,
        message_type: Option<&str>,
    ) -> Result<i64> {
        if let Some(tipo) = inbox.override_tipo_lista {
            return Ok(tipo);
        }
        if let Some(message_type) = message_type {
            if let Some(tipo) = self
                .store
                .get_type_mapping(integration_key, message_type)
                .await?
            {
                return Ok(tipo);
            }
        }
        Ok(DEFAULT_TIPO_LISTA)
    }

    async fn finish_without_orders(
        &self,
        inbox_id: i64,
        applied_by: &str,
    ) -> Result<ApplyOutcome> {
        let tx = self.store.begin().await?;
        tx.mark_inbox_applied(inbox_id, ApplyStatus::Failed, MESSAGE_NO_ORDERS)
            .await?;
        tx.insert_apply_audit(inbox_id, Some(applied_by), ApplyStatus::Failed, MESSAGE_NO_ORDERS)
            .await?;
        tx.commit().await?;

        Ok(ApplyOutcome {
            status: ApplyStatus::Failed,
            message: MESSAGE_NO_ORDERS.to_string(),
            created: Vec::new(),
            errors: Vec::new(),
        })
    }
}

fn list_description(message_type: Option<&str>) -> String {
    format!("EDI {}", message_type.unwrap_or(""))
        .trim()
        .to_string()
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
