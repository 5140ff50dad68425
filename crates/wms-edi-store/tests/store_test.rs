//! Store integration tests against the in-memory backend.

use wms_edi_store::{
    ApplyStatus, NewApplyError, NewItemMapping, NewList, NewListRow, Store,
};

async fn store() -> Store {
    Store::open_in_memory().await.unwrap()
}

#[tokio::test]
async fn migrate_is_idempotent() {
    let store = store().await;
    // open_in_memory already migrated once; a rerun applies nothing.
    assert_eq!(store.migrate().await.unwrap(), 0);
}

#[tokio::test]
async fn item_lookup_is_exact_and_case_sensitive() {
    let store = store().await;
    let id = store.insert_item("ART-1", "Widget", None).await.unwrap();

    assert_eq!(store.find_item_id_by_code("ART-1").await.unwrap(), Some(id));
    assert_eq!(store.find_item_id_by_code("art-1").await.unwrap(), None);
    assert_eq!(store.find_item_id_by_code("ART-10").await.unwrap(), None);
}

#[tokio::test]
async fn item_search_matches_code_description_and_barcode() {
    let store = store().await;
    store
        .insert_item("ART-1", "Widget blu", Some("8001234567890"))
        .await
        .unwrap();
    store.insert_item("BOLT-9", "Vite", None).await.unwrap();

    let by_code = store.search_items("ART", 10).await.unwrap();
    assert_eq!(by_code.len(), 1);
    assert_eq!(by_code[0].code, "ART-1");

    let by_description = store.search_items("blu", 10).await.unwrap();
    assert_eq!(by_description.len(), 1);

    let by_barcode = store.search_items("800123", 10).await.unwrap();
    assert_eq!(by_barcode.len(), 1);

    assert!(store.search_items("missing", 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn item_mapping_upsert_overwrites_by_key() {
    let store = store().await;

    store
        .upsert_item_mapping(&NewItemMapping {
            integration_key: "erp".to_string(),
            external_code: "EXT-1".to_string(),
            item_id: Some(10),
            ..NewItemMapping::default()
        })
        .await
        .unwrap();
    store
        .upsert_item_mapping(&NewItemMapping {
            integration_key: "erp".to_string(),
            external_code: "EXT-1".to_string(),
            item_id: None,
            item_code: Some("ART-1".to_string()),
            description: Some("remapped".to_string()),
        })
        .await
        .unwrap();

    let mapping = store
        .get_item_mapping("erp", "EXT-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(mapping.item_id, None);
    assert_eq!(mapping.item_code.as_deref(), Some("ART-1"));

    // Same external code under a different integration is a separate row.
    assert!(store.get_item_mapping("sap", "EXT-1").await.unwrap().is_none());

    let listed = store
        .list_item_mappings("erp", Some("EXT"), 10, 0)
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);

    assert!(store.delete_item_mapping("erp", mapping.id).await.unwrap());
    assert!(store.get_item_mapping("erp", "EXT-1").await.unwrap().is_none());
}

#[tokio::test]
async fn type_mapping_upsert_and_lookup() {
    let store = store().await;
    store.set_type_mapping("erp", "940", 3).await.unwrap();
    store.set_type_mapping("erp", "940", 5).await.unwrap();

    assert_eq!(store.get_type_mapping("erp", "940").await.unwrap(), Some(5));
    assert_eq!(store.get_type_mapping("erp", "850").await.unwrap(), None);
}

#[tokio::test]
async fn payload_loaders_shape_rows() {
    let store = store().await;
    let item_id = store
        .insert_item("ART-1", "Widget", Some("123"))
        .await
        .unwrap();
    let udc_id = store.insert_loading_unit(Some(77)).await.unwrap();
    store
        .insert_stock(udc_id, item_id, 12.5, Some("L1"), None)
        .await
        .unwrap();

    let items = store.load_items_payload(10).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].code, "ART-1");
    assert_eq!(items[0].barcode.as_deref(), Some("123"));

    let stock = store.load_stock_payload(10).await.unwrap();
    assert_eq!(stock.len(), 1);
    assert_eq!(stock[0].item_code, "ART-1");
    assert_eq!(stock[0].quantity, 12.5);
    assert_eq!(stock[0].lot.as_deref(), Some("L1"));
    assert_eq!(stock[0].location_id, Some(77));

    // One open list with two lines.
    let tx = store.begin().await.unwrap();
    let list_id = tx
        .insert_list(&NewList {
            num_lista: "ORD-1".to_string(),
            descrizione: "EDI 940".to_string(),
            rif_lista: Some("RIF-1".to_string()),
            id_tipo_lista: 1,
            priorita: 1,
        })
        .await
        .unwrap();
    for line in 1..=2 {
        tx.insert_list_row(
            list_id,
            &NewListRow {
                num_riga: line.to_string(),
                id_prodotto: item_id,
                codice: "ART-1".to_string(),
                qta_richiesta: 2.0,
            },
        )
        .await
        .unwrap();
    }
    tx.commit().await.unwrap();

    let orders = store.load_orders_payload(10).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].order_number, "ORD-1");
    assert_eq!(orders[0].total_rows, 2);
    assert_eq!(orders[0].reference.as_deref(), Some("RIF-1"));
}

#[tokio::test]
async fn payload_loaders_respect_limit() {
    let store = store().await;
    for index in 0..5 {
        store
            .insert_item(&format!("ART-{index}"), "x", None)
            .await
            .unwrap();
    }
    assert_eq!(store.load_items_payload(3).await.unwrap().len(), 3);
}

#[tokio::test]
async fn inbox_round_trip_with_overrides() {
    let store = store().await;
    let inbox_id = store
        .insert_inbox("erp", "orders", Some("940"), "W05*ORD-1*R~", Some("{}"))
        .await
        .unwrap();

    let record = store.get_inbox("erp", inbox_id).await.unwrap().unwrap();
    assert_eq!(record.flow, "orders");
    assert_eq!(record.message_type.as_deref(), Some("940"));
    assert!(record.applied_at.is_none());
    assert!(record.override_tipo_lista.is_none());

    assert!(
        store
            .set_inbox_overrides("erp", inbox_id, Some(4), Some(2), None)
            .await
            .unwrap()
    );
    let record = store.get_inbox("erp", inbox_id).await.unwrap().unwrap();
    assert_eq!(record.override_tipo_lista, Some(4));
    assert_eq!(record.override_area_id, Some(2));
    assert_eq!(record.override_machine_id, None);

    // Record is scoped to its integration key.
    assert!(store.get_inbox("sap", inbox_id).await.unwrap().is_none());

    let summaries = store.list_inbox("erp", 10, 0).await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].id, inbox_id);
}

#[tokio::test]
async fn sync_log_records_duration() {
    let store = store().await;
    let log_id = store.start_sync_log("erp", "inbound", "orders").await.unwrap();
    store
        .finish_sync_log(log_id, "SUCCESS", Some("EDI import 940"), Some(3))
        .await
        .unwrap();

    let logs = store.list_sync_logs("erp", 10).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, "SUCCESS");
    assert_eq!(logs[0].record_count, Some(3));
    assert!(logs[0].finished_at.is_some());
    assert!(logs[0].duration_ms.unwrap_or(-1) >= 0);
}

#[tokio::test]
async fn apply_writes_are_atomic_per_transaction() {
    let store = store().await;
    let item_id = store.insert_item("ART-1", "Widget", None).await.unwrap();
    let inbox_id = store
        .insert_inbox("erp", "orders", Some("940"), "raw", None)
        .await
        .unwrap();

    // Rolled-back transaction leaves nothing behind.
    let tx = store.begin().await.unwrap();
    let list_id = tx
        .insert_list(&NewList {
            num_lista: "ORD-R".to_string(),
            descrizione: "EDI 940".to_string(),
            rif_lista: None,
            id_tipo_lista: 1,
            priorita: 1,
        })
        .await
        .unwrap();
    tx.insert_list_row(
        list_id,
        &NewListRow {
            num_riga: "1".to_string(),
            id_prodotto: item_id,
            codice: "ART-1".to_string(),
            qta_richiesta: 1.0,
        },
    )
    .await
    .unwrap();
    tx.rollback().await.unwrap();
    assert!(store.list_lists().await.unwrap().is_empty());

    // Committed transaction persists lists, lines, errors, audit and the
    // inbox outcome together.
    let tx = store.begin().await.unwrap();
    let list_id = tx
        .insert_list(&NewList {
            num_lista: "ORD-1".to_string(),
            descrizione: "EDI 940".to_string(),
            rif_lista: None,
            id_tipo_lista: 1,
            priorita: 1,
        })
        .await
        .unwrap();
    tx.insert_list_row(
        list_id,
        &NewListRow {
            num_riga: "1".to_string(),
            id_prodotto: item_id,
            codice: "ART-1".to_string(),
            qta_richiesta: 3.0,
        },
    )
    .await
    .unwrap();
    tx.insert_area_detail(list_id, Some(2), Some(9)).await.unwrap();
    tx.insert_apply_error(
        inbox_id,
        &NewApplyError {
            order_number: Some("ORD-2".to_string()),
            reason: "Articolo non trovato".to_string(),
            ..NewApplyError::default()
        },
    )
    .await
    .unwrap();
    tx.mark_inbox_applied(inbox_id, ApplyStatus::Partial, "Ordini creati: 1, scarti: 1")
        .await
        .unwrap();
    tx.insert_apply_audit(inbox_id, Some("operator"), ApplyStatus::Partial, "Ordini creati: 1, scarti: 1")
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let lists = store.list_lists().await.unwrap();
    assert_eq!(lists.len(), 1);
    assert_eq!(lists[0].num_lista, "ORD-1");
    assert!(!lists[0].terminata);

    let rows = store.list_rows_for_list(lists[0].id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].qta_richiesta, 3.0);
    assert_eq!(rows[0].qta_movimentata, 0.0);
    assert_eq!(rows[0].qta_prenotata, 0.0);

    let details = store.list_area_details(lists[0].id).await.unwrap();
    assert_eq!(details.len(), 1);
    assert_eq!(details[0].id_area, Some(2));
    assert_eq!(details[0].id_macchina, Some(9));

    let errors = store.list_apply_errors(inbox_id, 10, 0).await.unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].reason, "Articolo non trovato");

    let audits = store.list_apply_audits(inbox_id).await.unwrap();
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0].status, ApplyStatus::Partial);
    assert_eq!(audits[0].applied_by.as_deref(), Some("operator"));

    let record = store.get_inbox("erp", inbox_id).await.unwrap().unwrap();
    assert_eq!(record.applied_status, Some(ApplyStatus::Partial));
    assert!(record.applied_at.is_some());
}

#[tokio::test]
async fn distinct_error_codes_for_suggestions() {
    let store = store().await;
    let inbox_id = store
        .insert_inbox("erp", "orders", Some("850"), "raw", None)
        .await
        .unwrap();

    let tx = store.begin().await.unwrap();
    for code in ["EXT-2", "EXT-1", "EXT-2"] {
        tx.insert_apply_error(
            inbox_id,
            &NewApplyError {
                item_code: Some(code.to_string()),
                reason: "Articolo non trovato".to_string(),
                ..NewApplyError::default()
            },
        )
        .await
        .unwrap();
    }
    tx.insert_apply_error(
        inbox_id,
        &NewApplyError {
            reason: "Numero ordine mancante".to_string(),
            ..NewApplyError::default()
        },
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();

    let codes = store.distinct_error_item_codes(inbox_id, 10).await.unwrap();
    assert_eq!(codes, vec!["EXT-1".to_string(), "EXT-2".to_string()]);
}

#[tokio::test]
async fn store_works_on_a_local_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wms.db");
    let config = wms_edi_store::DbConfig::local(path.to_string_lossy().to_string());

    let store = Store::open(&config).await.unwrap();
    store.migrate().await.unwrap();
    store.insert_item("ART-1", "Widget", None).await.unwrap();

    // A second handle over the same file sees the committed data.
    let store2 = Store::open(&config).await.unwrap();
    assert!(
        store2
            .find_item_id_by_code("ART-1")
            .await
            .unwrap()
            .is_some()
    );
}
