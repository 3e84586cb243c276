use anyhow::Result;
use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, TransactionTrait};

use super::KeyValueStore;
use crate::entities::{kv_entries, prelude::*};

/// Key-value blobs in the `kv_entries` table
pub struct SqliteStore {
    db: DatabaseConnection,
}

impl SqliteStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        let entry = KvEntries::find_by_id(key.to_string()).one(&self.db).await?;
        Ok(entry.map(|model| model.entry_value))
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        upsert(&self.db, key, value).await?;
        Ok(())
    }

    async fn set_items(&self, entries: &[(String, String)]) -> Result<()> {
        // Dropping the transaction before commit rolls every write back
        let txn = self.db.begin().await?;
        for (key, value) in entries {
            upsert(&txn, key, value).await?;
        }
        txn.commit().await?;
        Ok(())
    }
}

async fn upsert<C: ConnectionTrait>(conn: &C, key: &str, value: &str) -> Result<(), DbErr> {
    let entry = kv_entries::ActiveModel {
        entry_key: ActiveValue::Set(key.to_string()),
        entry_value: ActiveValue::Set(value.to_string()),
        updated_at: ActiveValue::Set(chrono::Utc::now().into()),
    };

    KvEntries::insert(entry)
        .on_conflict(
            OnConflict::column(kv_entries::Column::EntryKey)
                .update_columns([kv_entries::Column::EntryValue, kv_entries::Column::UpdatedAt])
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    Ok(())
}
