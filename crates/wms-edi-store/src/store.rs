//! Typed repository over the warehouse schema.
//!
//! Every collaborator operation the integration needs is a method here:
//! payload loaders for the outbound flows, item and mapping lookups for the
//! resolver, inbox bookkeeping, and the transactional writes used by one
//! apply pass. SQL strings stay in this module; callers only see typed
//! records.

use chrono::Utc;
use libsql::{Connection, Value, params_from_iter};
use tracing::warn;

use wms_edi_model::{ItemRow, OrderRow, StockRow};

use crate::connection::{Db, DbConfig, DbTransaction};
use crate::migrations::{MIGRATIONS, MIGRATIONS_TABLE_SQL};
use crate::records::{
    ApplyErrorRow, ApplyStatus, AreaDetailRow, AuditRow, InboxRecord, InboxSummary, ItemMapping,
    ItemSummary, ListRecord, ListRowRecord, NewApplyError, NewItemMapping, NewList, NewListRow,
    SyncLogRow,
};
use crate::{Error, Result};

/// Repository facade; cheap to clone.
#[derive(Clone)]
pub struct Store {
    db: Db,
}

impl Store {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Connect without touching the schema; call [`Self::migrate`] once at
    /// startup before serving.
    pub async fn open(config: &DbConfig) -> Result<Self> {
        Ok(Self::new(Db::connect(config).await?))
    }

    /// In-memory store with the full schema applied; test entry point.
    pub async fn open_in_memory() -> Result<Self> {
        let store = Self::open(&DbConfig::in_memory()).await?;
        store.migrate().await?;
        Ok(store)
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    /// Apply pending migrations; returns how many versions were applied.
    pub async fn migrate(&self) -> Result<usize> {
        let pooled = self.db.acquire().await?;
        let conn = pooled.connection()?;

        execute(conn, MIGRATIONS_TABLE_SQL, vec![]).await?;

        let mut applied = Vec::new();
        let mut rows = query(conn, "SELECT version FROM schema_migrations", vec![]).await?;
        while let Some(row) = next_row(&mut rows, "schema_migrations").await? {
            applied.push(int_req(&row, 0, "schema_migrations")?);
        }

        let mut count = 0;
        for migration in MIGRATIONS {
            if applied.contains(&migration.version) {
                continue;
            }
            for statement in migration.statements {
                execute(conn, statement, vec![]).await.map_err(|error| {
                    Error::Migration {
                        version: migration.version,
                        details: error.to_string(),
                    }
                })?;
            }
            execute(
                conn,
                "INSERT INTO schema_migrations (version, name, appliedAt) VALUES (?1, ?2, ?3)",
                vec![
                    Value::Integer(migration.version),
                    Value::Text(migration.name.to_string()),
                    Value::Text(now()),
                ],
            )
            .await?;
            tracing::info!(version = migration.version, name = migration.name, "applied migration");
            count += 1;
        }

        Ok(count)
    }

    /// Begin the single transaction used by one apply pass.
    pub async fn begin(&self) -> Result<DbTransaction> {
        self.db.begin().await
    }

    // ----- items -----

    pub async fn insert_item(
        &self,
        code: &str,
        description: &str,
        barcode: Option<&str>,
    ) -> Result<i64> {
        let pooled = self.db.acquire().await?;
        let conn = pooled.connection()?;
        execute(
            conn,
            "INSERT INTO Articoli (codice, descrizione, barcode) VALUES (?1, ?2, ?3)",
            vec![
                Value::Text(code.to_string()),
                Value::Text(description.to_string()),
                opt_text(barcode),
            ],
        )
        .await?;
        Ok(conn.last_insert_rowid())
    }

    /// Exact, case-sensitive lookup by internal item code.
    pub async fn find_item_id_by_code(&self, code: &str) -> Result<Option<i64>> {
        let pooled = self.db.acquire().await?;
        let conn = pooled.connection()?;
        let mut rows = query(
            conn,
            "SELECT id FROM Articoli WHERE codice = ?1 LIMIT 1",
            vec![Value::Text(code.to_string())],
        )
        .await?;
        match next_row(&mut rows, "Articoli").await? {
            Some(row) => Ok(Some(int_req(&row, 0, "Articoli")?)),
            None => Ok(None),
        }
    }

    /// Substring search over code, description and barcode.
    pub async fn search_items(&self, search: &str, limit: usize) -> Result<Vec<ItemSummary>> {
        let pattern = format!("%{search}%");
        let pooled = self.db.acquire().await?;
        let conn = pooled.connection()?;
        let mut rows = query(
            conn,
            "SELECT id, codice, descrizione, barcode
             FROM Articoli
             WHERE recordCancellato = 0
               AND (codice LIKE ?1 OR descrizione LIKE ?1 OR barcode LIKE ?1)
             ORDER BY codice
             LIMIT ?2",
            vec![Value::Text(pattern), Value::Integer(limit as i64)],
        )
        .await?;

        let mut items = Vec::new();
        while let Some(row) = next_row(&mut rows, "Articoli").await? {
            items.push(ItemSummary {
                id: int_req(&row, 0, "Articoli")?,
                code: text_req(&row, 1, "Articoli")?,
                description: text_at(&row, 2, "Articoli")?,
                barcode: text_at(&row, 3, "Articoli")?,
            });
        }
        Ok(items)
    }

    // ----- outbound payload loaders -----

    pub async fn load_items_payload(&self, limit: usize) -> Result<Vec<ItemRow>> {
        let pooled = self.db.acquire().await?;
        let conn = pooled.connection()?;
        let mut rows = query(
            conn,
            "SELECT id, codice, descrizione, barcode, um, peso, prezzoUnitario
             FROM Articoli
             WHERE recordCancellato = 0
             ORDER BY id DESC
             LIMIT ?1",
            vec![Value::Integer(limit as i64)],
        )
        .await?;

        let mut payload = Vec::new();
        while let Some(row) = next_row(&mut rows, "Articoli").await? {
            payload.push(ItemRow {
                id: int_req(&row, 0, "Articoli")?,
                code: text_req(&row, 1, "Articoli")?,
                description: text_at(&row, 2, "Articoli")?.unwrap_or_default(),
                barcode: text_at(&row, 3, "Articoli")?,
                unit_of_measure: text_at(&row, 4, "Articoli")?,
                weight: real_at(&row, 5, "Articoli")?,
                price: real_at(&row, 6, "Articoli")?,
            });
        }
        Ok(payload)
    }

    pub async fn load_stock_payload(&self, limit: usize) -> Result<Vec<StockRow>> {
        let pooled = self.db.acquire().await?;
        let conn = pooled.connection()?;
        let mut rows = query(
            conn,
            "SELECT UP.idArticolo, A.codice, A.descrizione, UP.qta, UP.lotto, UP.matricola,
                    U.idLocazione, U.id
             FROM UdcProdotti UP
             LEFT JOIN Udc U ON UP.idUdc = U.id
             LEFT JOIN Articoli A ON UP.idArticolo = A.id
             WHERE UP.recordCancellato = 0
             ORDER BY UP.id DESC
             LIMIT ?1",
            vec![Value::Integer(limit as i64)],
        )
        .await?;

        let mut payload = Vec::new();
        while let Some(row) = next_row(&mut rows, "UdcProdotti").await? {
            payload.push(StockRow {
                item_id: int_req(&row, 0, "UdcProdotti")?,
                item_code: text_at(&row, 1, "UdcProdotti")?.unwrap_or_default(),
                item_description: text_at(&row, 2, "UdcProdotti")?.unwrap_or_default(),
                quantity: real_at(&row, 3, "UdcProdotti")?.unwrap_or(0.0),
                lot: text_at(&row, 4, "UdcProdotti")?,
                serial_number: text_at(&row, 5, "UdcProdotti")?,
                location_id: int_at(&row, 6, "UdcProdotti")?,
                loading_unit_id: int_at(&row, 7, "UdcProdotti")?,
            });
        }
        Ok(payload)
    }

    pub async fn load_orders_payload(&self, limit: usize) -> Result<Vec<OrderRow>> {
        let pooled = self.db.acquire().await?;
        let conn = pooled.connection()?;
        let mut rows = query(
            conn,
            "SELECT L.id, L.numLista, L.descrizione, L.rifLista, L.idTipoLista, L.priorita,
                    COUNT(RL.id) AS totalRows
             FROM Liste L
             LEFT JOIN RigheLista RL ON L.id = RL.idLista
             WHERE L.terminata = 0 AND L.recordCancellato = 0
             GROUP BY L.id, L.numLista, L.descrizione, L.rifLista, L.idTipoLista, L.priorita
             ORDER BY L.dataCreazione DESC
             LIMIT ?1",
            vec![Value::Integer(limit as i64)],
        )
        .await?;

        let mut payload = Vec::new();
        while let Some(row) = next_row(&mut rows, "Liste").await? {
            payload.push(OrderRow {
                id: int_req(&row, 0, "Liste")?,
                order_number: text_req(&row, 1, "Liste")?,
                description: text_at(&row, 2, "Liste")?.unwrap_or_default(),
                reference: text_at(&row, 3, "Liste")?,
                order_type: int_at(&row, 4, "Liste")?,
                priority: int_at(&row, 5, "Liste")?,
                total_rows: int_req(&row, 6, "Liste")?,
            });
        }
        Ok(payload)
    }

    // ----- stock seeding -----

    pub async fn insert_loading_unit(&self, location_id: Option<i64>) -> Result<i64> {
        let pooled = self.db.acquire().await?;
        let conn = pooled.connection()?;
        execute(
            conn,
            "INSERT INTO Udc (idLocazione) VALUES (?1)",
            vec![opt_int(location_id)],
        )
        .await?;
        Ok(conn.last_insert_rowid())
    }

    pub async fn insert_stock(
        &self,
        loading_unit_id: i64,
        item_id: i64,
        quantity: f64,
        lot: Option<&str>,
        serial_number: Option<&str>,
    ) -> Result<i64> {
        let pooled = self.db.acquire().await?;
        let conn = pooled.connection()?;
        execute(
            conn,
            "INSERT INTO UdcProdotti (idUdc, idArticolo, qta, lotto, matricola)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            vec![
                Value::Integer(loading_unit_id),
                Value::Integer(item_id),
                Value::Real(quantity),
                opt_text(lot),
                opt_text(serial_number),
            ],
        )
        .await?;
        Ok(conn.last_insert_rowid())
    }

    // ----- item mappings -----

    pub async fn upsert_item_mapping(&self, mapping: &NewItemMapping) -> Result<()> {
        let pooled = self.db.acquire().await?;
        let conn = pooled.connection()?;
        execute(
            conn,
            "INSERT INTO IntegrationItemMap
                 (integrationKey, externalCode, itemId, itemCode, description, createdAt)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(integrationKey, externalCode) DO UPDATE SET
                 itemId = excluded.itemId,
                 itemCode = excluded.itemCode,
                 description = excluded.description",
            vec![
                Value::Text(mapping.integration_key.clone()),
                Value::Text(mapping.external_code.clone()),
                opt_int(mapping.item_id),
                opt_text(mapping.item_code.as_deref()),
                opt_text(mapping.description.as_deref()),
                Value::Text(now()),
            ],
        )
        .await?;
        Ok(())
    }

    pub async fn get_item_mapping(
        &self,
        integration_key: &str,
        external_code: &str,
    ) -> Result<Option<ItemMapping>> {
        let pooled = self.db.acquire().await?;
        let conn = pooled.connection()?;
        let mut rows = query(
            conn,
            "SELECT id, integrationKey, externalCode, itemId, itemCode, description, createdAt
             FROM IntegrationItemMap
             WHERE integrationKey = ?1 AND externalCode = ?2
             LIMIT 1",
            vec![
                Value::Text(integration_key.to_string()),
                Value::Text(external_code.to_string()),
            ],
        )
        .await?;
        match next_row(&mut rows, "IntegrationItemMap").await? {
            Some(row) => Ok(Some(read_item_mapping(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn list_item_mappings(
        &self,
        integration_key: &str,
        search: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ItemMapping>> {
        let pooled = self.db.acquire().await?;
        let conn = pooled.connection()?;

        let (sql, params) = match search {
            Some(search) => (
                "SELECT id, integrationKey, externalCode, itemId, itemCode, description, createdAt
                 FROM IntegrationItemMap
                 WHERE integrationKey = ?1 AND (externalCode LIKE ?2 OR itemCode LIKE ?2)
                 ORDER BY createdAt DESC, id DESC
                 LIMIT ?3 OFFSET ?4",
                vec![
                    Value::Text(integration_key.to_string()),
                    Value::Text(format!("%{search}%")),
                    Value::Integer(limit as i64),
                    Value::Integer(offset as i64),
                ],
            ),
            None => (
                "SELECT id, integrationKey, externalCode, itemId, itemCode, description, createdAt
                 FROM IntegrationItemMap
                 WHERE integrationKey = ?1
                 ORDER BY createdAt DESC, id DESC
                 LIMIT ?2 OFFSET ?3",
                vec![
                    Value::Text(integration_key.to_string()),
                    Value::Integer(limit as i64),
                    Value::Integer(offset as i64),
                ],
            ),
        };

        let mut rows = query(conn, sql, params).await?;
        let mut mappings = Vec::new();
        while let Some(row) = next_row(&mut rows, "IntegrationItemMap").await? {
            mappings.push(read_item_mapping(&row)?);
        }
        Ok(mappings)
    }

    pub async fn delete_item_mapping(&self, integration_key: &str, id: i64) -> Result<bool> {
        let pooled = self.db.acquire().await?;
        let conn = pooled.connection()?;
        let changed = execute(
            conn,
            "DELETE FROM IntegrationItemMap WHERE integrationKey = ?1 AND id = ?2",
            vec![Value::Text(integration_key.to_string()), Value::Integer(id)],
        )
        .await?;
        Ok(changed > 0)
    }

    // ----- message-type to order-type map -----

    pub async fn set_type_mapping(
        &self,
        integration_key: &str,
        message_type: &str,
        id_tipo_lista: i64,
    ) -> Result<()> {
        let pooled = self.db.acquire().await?;
        let conn = pooled.connection()?;
        execute(
            conn,
            "INSERT INTO IntegrationTypeMap (integrationKey, messageType, idTipoLista)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(integrationKey, messageType) DO UPDATE SET
                 idTipoLista = excluded.idTipoLista",
            vec![
                Value::Text(integration_key.to_string()),
                Value::Text(message_type.to_string()),
                Value::Integer(id_tipo_lista),
            ],
        )
        .await?;
        Ok(())
    }

    pub async fn get_type_mapping(
        &self,
        integration_key: &str,
        message_type: &str,
    ) -> Result<Option<i64>> {
        let pooled = self.db.acquire().await?;
        let conn = pooled.connection()?;
        let mut rows = query(
            conn,
            "SELECT idTipoLista FROM IntegrationTypeMap
             WHERE integrationKey = ?1 AND messageType = ?2
             LIMIT 1",
            vec![
                Value::Text(integration_key.to_string()),
                Value::Text(message_type.to_string()),
            ],
        )
        .await?;
        match next_row(&mut rows, "IntegrationTypeMap").await? {
            Some(row) => Ok(Some(int_req(&row, 0, "IntegrationTypeMap")?)),
            None => Ok(None),
        }
    }

    // ----- EDI inbox -----

    pub async fn insert_inbox(
        &self,
        integration_key: &str,
        flow: &str,
        message_type: Option<&str>,
        raw_content: &str,
        parsed_json: Option<&str>,
    ) -> Result<i64> {
        let pooled = self.db.acquire().await?;
        let conn = pooled.connection()?;
        execute(
            conn,
            "INSERT INTO IntegrationEdiInbox
                 (integrationKey, flow, messageType, rawContent, parsedJson, receivedAt)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            vec![
                Value::Text(integration_key.to_string()),
                Value::Text(flow.to_string()),
                opt_text(message_type),
                Value::Text(raw_content.to_string()),
                opt_text(parsed_json),
                Value::Text(now()),
            ],
        )
        .await?;
        Ok(conn.last_insert_rowid())
    }

    pub async fn get_inbox(&self, integration_key: &str, id: i64) -> Result<Option<InboxRecord>> {
        let pooled = self.db.acquire().await?;
        let conn = pooled.connection()?;
        let mut rows = query(
            conn,
            "SELECT id, integrationKey, flow, messageType, rawContent, parsedJson, receivedAt,
                    appliedAt, appliedStatus, appliedMessage,
                    overrideTipoLista, overrideAreaId, overrideMachineId
             FROM IntegrationEdiInbox
             WHERE integrationKey = ?1 AND id = ?2",
            vec![Value::Text(integration_key.to_string()), Value::Integer(id)],
        )
        .await?;

        match next_row(&mut rows, "IntegrationEdiInbox").await? {
            Some(row) => Ok(Some(InboxRecord {
                id: int_req(&row, 0, "IntegrationEdiInbox")?,
                integration_key: text_req(&row, 1, "IntegrationEdiInbox")?,
                flow: text_req(&row, 2, "IntegrationEdiInbox")?,
                message_type: text_at(&row, 3, "IntegrationEdiInbox")?,
                raw_content: text_req(&row, 4, "IntegrationEdiInbox")?,
                parsed_json: text_at(&row, 5, "IntegrationEdiInbox")?,
                received_at: text_req(&row, 6, "IntegrationEdiInbox")?,
                applied_at: text_at(&row, 7, "IntegrationEdiInbox")?,
                applied_status: parse_status(text_at(&row, 8, "IntegrationEdiInbox")?)?,
                applied_message: text_at(&row, 9, "IntegrationEdiInbox")?,
                override_tipo_lista: int_at(&row, 10, "IntegrationEdiInbox")?,
                override_area_id: int_at(&row, 11, "IntegrationEdiInbox")?,
                override_machine_id: int_at(&row, 12, "IntegrationEdiInbox")?,
            })),
            None => Ok(None),
        }
    }

    pub async fn list_inbox(
        &self,
        integration_key: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<InboxSummary>> {
        let pooled = self.db.acquire().await?;
        let conn = pooled.connection()?;
        let mut rows = query(
            conn,
            "SELECT id, integrationKey, flow, messageType, receivedAt,
                    appliedAt, appliedStatus, appliedMessage
             FROM IntegrationEdiInbox
             WHERE integrationKey = ?1
             ORDER BY receivedAt DESC, id DESC
             LIMIT ?2 OFFSET ?3",
            vec![
                Value::Text(integration_key.to_string()),
                Value::Integer(limit as i64),
                Value::Integer(offset as i64),
            ],
        )
        .await?;

        let mut summaries = Vec::new();
        while let Some(row) = next_row(&mut rows, "IntegrationEdiInbox").await? {
            summaries.push(InboxSummary {
                id: int_req(&row, 0, "IntegrationEdiInbox")?,
                integration_key: text_req(&row, 1, "IntegrationEdiInbox")?,
                flow: text_req(&row, 2, "IntegrationEdiInbox")?,
                message_type: text_at(&row, 3, "IntegrationEdiInbox")?,
                received_at: text_req(&row, 4, "IntegrationEdiInbox")?,
                applied_at: text_at(&row, 5, "IntegrationEdiInbox")?,
                applied_status: parse_status(text_at(&row, 6, "IntegrationEdiInbox")?)?,
                applied_message: text_at(&row, 7, "IntegrationEdiInbox")?,
            });
        }
        Ok(summaries)
    }

    pub async fn set_inbox_overrides(
        &self,
        integration_key: &str,
        id: i64,
        tipo_lista: Option<i64>,
        area_id: Option<i64>,
        machine_id: Option<i64>,
    ) -> Result<bool> {
        let pooled = self.db.acquire().await?;
        let conn = pooled.connection()?;
        let changed = execute(
            conn,
            "UPDATE IntegrationEdiInbox
             SET overrideTipoLista = ?3, overrideAreaId = ?4, overrideMachineId = ?5
             WHERE integrationKey = ?1 AND id = ?2",
            vec![
                Value::Text(integration_key.to_string()),
                Value::Integer(id),
                opt_int(tipo_lista),
                opt_int(area_id),
                opt_int(machine_id),
            ],
        )
        .await?;
        Ok(changed > 0)
    }

    // ----- sync log -----

    pub async fn start_sync_log(
        &self,
        integration_key: &str,
        direction: &str,
        flow: &str,
    ) -> Result<i64> {
        let pooled = self.db.acquire().await?;
        let conn = pooled.connection()?;
        execute(
            conn,
            "INSERT INTO IntegrationSyncLog (integrationKey, direction, flow, status, startedAt)
             VALUES (?1, ?2, ?3, 'IN_PROGRESS', ?4)",
            vec![
                Value::Text(integration_key.to_string()),
                Value::Text(direction.to_string()),
                Value::Text(flow.to_string()),
                Value::Text(now()),
            ],
        )
        .await?;
        Ok(conn.last_insert_rowid())
    }

    pub async fn finish_sync_log(
        &self,
        id: i64,
        status: &str,
        message: Option<&str>,
        record_count: Option<i64>,
    ) -> Result<()> {
        let pooled = self.db.acquire().await?;
        let conn = pooled.connection()?;

        let mut rows = query(
            conn,
            "SELECT startedAt FROM IntegrationSyncLog WHERE id = ?1",
            vec![Value::Integer(id)],
        )
        .await?;
        let started_at = match next_row(&mut rows, "IntegrationSyncLog").await? {
            Some(row) => text_req(&row, 0, "IntegrationSyncLog")?,
            None => {
                return Err(Error::Query {
                    table: "IntegrationSyncLog".to_string(),
                    details: format!("Sync log {id} not found"),
                });
            }
        };
        let finished = Utc::now();
        let duration_ms = chrono::DateTime::parse_from_rfc3339(&started_at)
            .map(|started| (finished - started.with_timezone(&Utc)).num_milliseconds())
            .unwrap_or(0);

        execute(
            conn,
            "UPDATE IntegrationSyncLog
             SET status = ?2, message = ?3, recordCount = ?4, finishedAt = ?5, durationMs = ?6
             WHERE id = ?1",
            vec![
                Value::Integer(id),
                Value::Text(status.to_string()),
                opt_text(message),
                opt_int(record_count),
                Value::Text(finished.to_rfc3339()),
                Value::Integer(duration_ms),
            ],
        )
        .await?;
        Ok(())
    }

    pub async fn list_sync_logs(
        &self,
        integration_key: &str,
        limit: usize,
    ) -> Result<Vec<SyncLogRow>> {
        let pooled = self.db.acquire().await?;
        let conn = pooled.connection()?;
        let mut rows = query(
            conn,
            "SELECT id, integrationKey, direction, flow, status, message, recordCount,
                    startedAt, finishedAt, durationMs
             FROM IntegrationSyncLog
             WHERE integrationKey = ?1
             ORDER BY startedAt DESC, id DESC
             LIMIT ?2",
            vec![
                Value::Text(integration_key.to_string()),
                Value::Integer(limit as i64),
            ],
        )
        .await?;

        let mut logs = Vec::new();
        while let Some(row) = next_row(&mut rows, "IntegrationSyncLog").await? {
            logs.push(SyncLogRow {
                id: int_req(&row, 0, "IntegrationSyncLog")?,
                integration_key: text_req(&row, 1, "IntegrationSyncLog")?,
                direction: text_req(&row, 2, "IntegrationSyncLog")?,
                flow: text_req(&row, 3, "IntegrationSyncLog")?,
                status: text_req(&row, 4, "IntegrationSyncLog")?,
                message: text_at(&row, 5, "IntegrationSyncLog")?,
                record_count: int_at(&row, 6, "IntegrationSyncLog")?,
                started_at: text_req(&row, 7, "IntegrationSyncLog")?,
                finished_at: text_at(&row, 8, "IntegrationSyncLog")?,
                duration_ms: int_at(&row, 9, "IntegrationSyncLog")?,
            });
        }
        Ok(logs)
    }

    // ----- apply errors / audit reads -----

    pub async fn list_apply_errors(
        &self,
        inbox_id: i64,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ApplyErrorRow>> {
        let pooled = self.db.acquire().await?;
        let conn = pooled.connection()?;
        let mut rows = query(
            conn,
            "SELECT id, inboxId, orderNumber, lineNumber, itemCode, reason, createdAt
             FROM IntegrationEdiApplyErrors
             WHERE inboxId = ?1
             ORDER BY id
             LIMIT ?2 OFFSET ?3",
            vec![
                Value::Integer(inbox_id),
                Value::Integer(limit as i64),
                Value::Integer(offset as i64),
            ],
        )
        .await?;

        let mut errors = Vec::new();
        while let Some(row) = next_row(&mut rows, "IntegrationEdiApplyErrors").await? {
            errors.push(ApplyErrorRow {
                id: int_req(&row, 0, "IntegrationEdiApplyErrors")?,
                inbox_id: int_req(&row, 1, "IntegrationEdiApplyErrors")?,
                order_number: text_at(&row, 2, "IntegrationEdiApplyErrors")?,
                line_number: text_at(&row, 3, "IntegrationEdiApplyErrors")?,
                item_code: text_at(&row, 4, "IntegrationEdiApplyErrors")?,
                reason: text_req(&row, 5, "IntegrationEdiApplyErrors")?,
                created_at: text_req(&row, 6, "IntegrationEdiApplyErrors")?,
            });
        }
        Ok(errors)
    }

    /// Distinct unresolved item codes recorded for one inbox record.
    pub async fn distinct_error_item_codes(
        &self,
        inbox_id: i64,
        limit: usize,
    ) -> Result<Vec<String>> {
        let pooled = self.db.acquire().await?;
        let conn = pooled.connection()?;
        let mut rows = query(
            conn,
            "SELECT DISTINCT itemCode
             FROM IntegrationEdiApplyErrors
             WHERE inboxId = ?1 AND itemCode IS NOT NULL
             ORDER BY itemCode
             LIMIT ?2",
            vec![Value::Integer(inbox_id), Value::Integer(limit as i64)],
        )
        .await?;

        let mut codes = Vec::new();
        while let Some(row) = next_row(&mut rows, "IntegrationEdiApplyErrors").await? {
            codes.push(text_req(&row, 0, "IntegrationEdiApplyErrors")?);
        }
        Ok(codes)
    }

    pub async fn list_apply_audits(&self, inbox_id: i64) -> Result<Vec<AuditRow>> {
        let pooled = self.db.acquire().await?;
        let conn = pooled.connection()?;
        let mut rows = query(
            conn,
            "SELECT id, inboxId, appliedBy, appliedAt, status, message
             FROM IntegrationEdiApplyAudit
             WHERE inboxId = ?1
             ORDER BY id",
            vec![Value::Integer(inbox_id)],
        )
        .await?;

        let mut audits = Vec::new();
        while let Some(row) = next_row(&mut rows, "IntegrationEdiApplyAudit").await? {
            let status = text_req(&row, 4, "IntegrationEdiApplyAudit")?;
            audits.push(AuditRow {
                id: int_req(&row, 0, "IntegrationEdiApplyAudit")?,
                inbox_id: int_req(&row, 1, "IntegrationEdiApplyAudit")?,
                applied_by: text_at(&row, 2, "IntegrationEdiApplyAudit")?,
                applied_at: text_req(&row, 3, "IntegrationEdiApplyAudit")?,
                status: status.parse()?,
                message: text_at(&row, 5, "IntegrationEdiApplyAudit")?,
            });
        }
        Ok(audits)
    }

    // ----- list reads -----

    pub async fn get_list(&self, id: i64) -> Result<Option<ListRecord>> {
        let pooled = self.db.acquire().await?;
        let conn = pooled.connection()?;
        let mut rows = query(
            conn,
            "SELECT id, numLista, descrizione, rifLista, idTipoLista, priorita, terminata
             FROM Liste
             WHERE id = ?1",
            vec![Value::Integer(id)],
        )
        .await?;
        match next_row(&mut rows, "Liste").await? {
            Some(row) => Ok(Some(read_list(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn list_lists(&self) -> Result<Vec<ListRecord>> {
        let pooled = self.db.acquire().await?;
        let conn = pooled.connection()?;
        let mut rows = query(
            conn,
            "SELECT id, numLista, descrizione, rifLista, idTipoLista, priorita, terminata
             FROM Liste
             WHERE recordCancellato = 0
             ORDER BY id",
            vec![],
        )
        .await?;

        let mut lists = Vec::new();
        while let Some(row) = next_row(&mut rows, "Liste").await? {
            lists.push(read_list(&row)?);
        }
        Ok(lists)
    }

    pub async fn list_rows_for_list(&self, list_id: i64) -> Result<Vec<ListRowRecord>> {
        let pooled = self.db.acquire().await?;
        let conn = pooled.connection()?;
        let mut rows = query(
            conn,
            "SELECT id, idLista, numRigaLista, idProdotto, codice,
                    qtaRichiesta, qtaMovimentata, qtaPrenotata
             FROM RigheLista
             WHERE idLista = ?1 AND recordCancellato = 0
             ORDER BY id",
            vec![Value::Integer(list_id)],
        )
        .await?;

        let mut records = Vec::new();
        while let Some(row) = next_row(&mut rows, "RigheLista").await? {
            records.push(ListRowRecord {
                id: int_req(&row, 0, "RigheLista")?,
                id_lista: int_req(&row, 1, "RigheLista")?,
                num_riga: text_at(&row, 2, "RigheLista")?,
                id_prodotto: int_req(&row, 3, "RigheLista")?,
                codice: text_at(&row, 4, "RigheLista")?,
                qta_richiesta: real_at(&row, 5, "RigheLista")?.unwrap_or(0.0),
                qta_movimentata: real_at(&row, 6, "RigheLista")?.unwrap_or(0.0),
                qta_prenotata: real_at(&row, 7, "RigheLista")?.unwrap_or(0.0),
            });
        }
        Ok(records)
    }

    pub async fn list_area_details(&self, list_id: i64) -> Result<Vec<AreaDetailRow>> {
        let pooled = self.db.acquire().await?;
        let conn = pooled.connection()?;
        let mut rows = query(
            conn,
            "SELECT id, idLista, idArea, idMacchina FROM ListeAreaDetails WHERE idLista = ?1",
            vec![Value::Integer(list_id)],
        )
        .await?;

        let mut details = Vec::new();
        while let Some(row) = next_row(&mut rows, "ListeAreaDetails").await? {
            details.push(AreaDetailRow {
                id: int_req(&row, 0, "ListeAreaDetails")?,
                id_lista: int_req(&row, 1, "ListeAreaDetails")?,
                id_area: int_at(&row, 2, "ListeAreaDetails")?,
                id_macchina: int_at(&row, 3, "ListeAreaDetails")?,
            });
        }
        Ok(details)
    }
}

// Transactional writes used by one apply pass. All of them run on the
// transaction's connection and become visible only at commit.
impl DbTransaction {
    pub async fn insert_list(&self, list: &NewList) -> Result<i64> {
        let conn = self.connection()?;
        execute(
            conn,
            "INSERT INTO Liste
                 (numLista, descrizione, rifLista, idTipoLista, priorita,
                  terminata, recordCancellato, dataCreazione)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, 0, ?6)",
            vec![
                Value::Text(list.num_lista.clone()),
                Value::Text(list.descrizione.clone()),
                opt_text(list.rif_lista.as_deref()),
                Value::Integer(list.id_tipo_lista),
                Value::Integer(list.priorita),
                Value::Text(now()),
            ],
        )
        .await?;
        Ok(conn.last_insert_rowid())
    }

    pub async fn insert_list_row(&self, list_id: i64, row: &NewListRow) -> Result<i64> {
        let conn = self.connection()?;
        execute(
            conn,
            "INSERT INTO RigheLista
                 (idLista, numRigaLista, idProdotto, codice, descrizione,
                  qtaRichiesta, qtaMovimentata, qtaPrenotata, recordCancellato, dataCreazione)
             VALUES (?1, ?2, ?3, ?4, NULL, ?5, 0, 0, 0, ?6)",
            vec![
                Value::Integer(list_id),
                Value::Text(row.num_riga.clone()),
                Value::Integer(row.id_prodotto),
                Value::Text(row.codice.clone()),
                Value::Real(row.qta_richiesta),
                Value::Text(now()),
            ],
        )
        .await?;
        Ok(conn.last_insert_rowid())
    }

    /// Attach an area/machine association to a created list, best-effort:
    /// a schema without the table is tolerated and reported as `false`.
    pub async fn insert_area_detail(
        &self,
        list_id: i64,
        area_id: Option<i64>,
        machine_id: Option<i64>,
    ) -> Result<bool> {
        let conn = self.connection()?;
        let result = execute(
            conn,
            "INSERT INTO ListeAreaDetails (idLista, idArea, idMacchina) VALUES (?1, ?2, ?3)",
            vec![Value::Integer(list_id), opt_int(area_id), opt_int(machine_id)],
        )
        .await;

        match result {
            Ok(_) => Ok(true),
            Err(Error::Sql { source, .. })
                if source.to_string().contains("no such table") =>
            {
                warn!(list_id, "ListeAreaDetails table missing, skipping area association");
                Ok(false)
            }
            Err(error) => Err(error),
        }
    }

    pub async fn insert_apply_error(&self, inbox_id: i64, error: &NewApplyError) -> Result<()> {
        let conn = self.connection()?;
        execute(
            conn,
            "INSERT INTO IntegrationEdiApplyErrors
                 (inboxId, orderNumber, lineNumber, itemCode, reason, createdAt)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            vec![
                Value::Integer(inbox_id),
                opt_text(error.order_number.as_deref()),
                opt_text(error.line_number.as_deref()),
                opt_text(error.item_code.as_deref()),
                Value::Text(error.reason.clone()),
                Value::Text(now()),
            ],
        )
        .await?;
        Ok(())
    }

    pub async fn insert_apply_audit(
        &self,
        inbox_id: i64,
        applied_by: Option<&str>,
        status: ApplyStatus,
        message: &str,
    ) -> Result<()> {
        let conn = self.connection()?;
        execute(
            conn,
            "INSERT INTO IntegrationEdiApplyAudit (inboxId, appliedBy, appliedAt, status, message)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            vec![
                Value::Integer(inbox_id),
                opt_text(applied_by),
                Value::Text(now()),
                Value::Text(status.as_str().to_string()),
                Value::Text(message.to_string()),
            ],
        )
        .await?;
        Ok(())
    }

    pub async fn mark_inbox_applied(
        &self,
        inbox_id: i64,
        status: ApplyStatus,
        message: &str,
    ) -> Result<()> {
        let conn = self.connection()?;
        execute(
            conn,
            "UPDATE IntegrationEdiInbox
             SET appliedAt = ?2, appliedStatus = ?3, appliedMessage = ?4
             WHERE id = ?1",
            vec![
                Value::Integer(inbox_id),
                Value::Text(now()),
                Value::Text(status.as_str().to_string()),
                Value::Text(message.to_string()),
            ],
        )
        .await?;
        Ok(())
    }
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

fn opt_text(value: Option<&str>) -> Value {
    match value {
        Some(text) => Value::Text(text.to_string()),
        None => Value::Null,
    }
}

fn opt_int(value: Option<i64>) -> Value {
    match value {
        Some(number) => Value::Integer(number),
        None => Value::Null,
    }
}

async fn execute(conn: &Connection, sql: &str, params: Vec<Value>) -> Result<u64> {
    conn.execute(sql, params_from_iter(params))
        .await
        .map_err(|source| Error::sql(sql, source))
}

async fn query(conn: &Connection, sql: &str, params: Vec<Value>) -> Result<libsql::Rows> {
    conn.query(sql, params_from_iter(params))
        .await
        .map_err(|source| Error::sql(sql, source))
}

async fn next_row(rows: &mut libsql::Rows, table: &str) -> Result<Option<libsql::Row>> {
    rows.next().await.map_err(|source| Error::Query {
        table: table.to_string(),
        details: format!("Failed to advance cursor: {source}"),
    })
}

fn value_at(row: &libsql::Row, index: i32, table: &str) -> Result<Value> {
    row.get_value(index).map_err(|source| Error::Query {
        table: table.to_string(),
        details: format!("Failed to read column {index}: {source}"),
    })
}

fn text_at(row: &libsql::Row, index: i32, table: &str) -> Result<Option<String>> {
    match value_at(row, index, table)? {
        Value::Null => Ok(None),
        Value::Text(text) => Ok(Some(text)),
        other => Err(Error::Query {
            table: table.to_string(),
            details: format!("Expected text at column {index}, found {other:?}"),
        }),
    }
}

fn text_req(row: &libsql::Row, index: i32, table: &str) -> Result<String> {
    Ok(text_at(row, index, table)?.unwrap_or_default())
}

fn int_at(row: &libsql::Row, index: i32, table: &str) -> Result<Option<i64>> {
    match value_at(row, index, table)? {
        Value::Null => Ok(None),
        Value::Integer(number) => Ok(Some(number)),
        other => Err(Error::Query {
            table: table.to_string(),
            details: format!("Expected integer at column {index}, found {other:?}"),
        }),
    }
}

fn int_req(row: &libsql::Row, index: i32, table: &str) -> Result<i64> {
    int_at(row, index, table)?.ok_or_else(|| Error::Query {
        table: table.to_string(),
        details: format!("Unexpected NULL at column {index}"),
    })
}

fn real_at(row: &libsql::Row, index: i32, table: &str) -> Result<Option<f64>> {
    match value_at(row, index, table)? {
        Value::Null => Ok(None),
        Value::Real(number) => Ok(Some(number)),
        // SQLite may hand back whole REALs as integers.
        Value::Integer(number) => Ok(Some(number as f64)),
        other => Err(Error::Query {
            table: table.to_string(),
            details: format!("Expected real at column {index}, found {other:?}"),
        }),
    }
}

fn bool_req(row: &libsql::Row, index: i32, table: &str) -> Result<bool> {
    Ok(int_req(row, index, table)? != 0)
}

fn parse_status(value: Option<String>) -> Result<Option<ApplyStatus>> {
    match value {
        None => Ok(None),
        Some(text) => Ok(Some(text.parse()?)),
    }
}

fn read_item_mapping(row: &libsql::Row) -> Result<ItemMapping> {
    Ok(ItemMapping {
        id: int_req(row, 0, "IntegrationItemMap")?,
        integration_key: text_req(row, 1, "IntegrationItemMap")?,
        external_code: text_req(row, 2, "IntegrationItemMap")?,
        item_id: int_at(row, 3, "IntegrationItemMap")?,
        item_code: text_at(row, 4, "IntegrationItemMap")?,
        description: text_at(row, 5, "IntegrationItemMap")?,
        created_at: text_req(row, 6, "IntegrationItemMap")?,
    })
}

fn read_list(row: &libsql::Row) -> Result<ListRecord> {
    Ok(ListRecord {
        id: int_req(row, 0, "Liste")?,
        num_lista: text_req(row, 1, "Liste")?,
        descrizione: text_at(row, 2, "Liste")?,
        rif_lista: text_at(row, 3, "Liste")?,
        id_tipo_lista: int_req(row, 4, "Liste")?,
        priorita: int_req(row, 5, "Liste")?,
        terminata: bool_req(row, 6, "Liste")?,
    })
}
