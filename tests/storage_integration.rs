use std::env;

use sales_crm_api::db::Database;
use sales_crm_api::record::{generate_id, now, FieldValue, Record};
use sales_crm_api::schema::{CREATED_AT, ID, LEADS, UPDATED_AT};
use sales_crm_api::store::{PgRecordStore, RecordStore};

/// Integration smoke test for the PostgreSQL store.
/// Marked ignored to avoid running against production by accident; set TEST_DATABASE_URL to run.
#[tokio::test]
#[ignore]
async fn lead_round_trip_smoke_test() -> anyhow::Result<()> {
    let db_url = env::var("TEST_DATABASE_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .map_err(|_| anyhow::anyhow!("Set TEST_DATABASE_URL or DATABASE_URL to run this test"))?;

    let db = Database::new(&db_url, 2).await?;
    let store = PgRecordStore::new(db.pool.clone());

    let id = generate_id();
    let created_at = now();
    let mut record = Record::new();
    record.insert(ID, FieldValue::Text(id.clone()));
    record.insert(CREATED_AT, FieldValue::Timestamp(created_at));
    for field in LEADS.required_fields() {
        record.insert(field, FieldValue::Text(format!("smoke {}", field)));
    }

    let stored = store
        .insert(&LEADS, record)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert_eq!(stored.get(CREATED_AT), Some(&FieldValue::Timestamp(created_at)));
    assert_eq!(stored.get(UPDATED_AT), Some(&FieldValue::Null));

    let mut changes = Record::new();
    changes.insert("leadStatus", FieldValue::Text("Qualified".into()));
    changes.insert(UPDATED_AT, FieldValue::Timestamp(now()));
    let updated = store
        .update(&LEADS, &id, changes)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .ok_or_else(|| anyhow::anyhow!("row vanished"))?;
    assert_eq!(
        updated.get("leadStatus"),
        Some(&FieldValue::Text("Qualified".into()))
    );

    assert!(store
        .delete(&LEADS, &id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?);
    assert!(store
        .fetch(&LEADS, &id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .is_none());

    Ok(())
}
