use std::path::Path;
use std::sync::Arc;

use geodir_shared::models::{EntityKind, GeoEntity};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};

const ENTITIES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("entities");

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] redb::DatabaseError),
    #[error("transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),
    #[error("table error: {0}")]
    Table(#[from] redb::TableError),
    #[error("storage error: {0}")]
    Storage(#[from] redb::StorageError),
    #[error("commit error: {0}")]
    Commit(#[from] redb::CommitError),
    #[error("corrupt entity record: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Read-mostly entity catalogue.
pub struct Storage {
    db: Database,
}

impl Storage {
    pub fn open(path: &Path) -> Result<Arc<Self>, StoreError> {
        let db = Database::create(path)?;

        // Ensure table exists
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ENTITIES_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Arc::new(Storage { db }))
    }

    /// Replace the whole catalogue in one transaction.
    pub fn replace_all(&self, entities: &[GeoEntity]) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(ENTITIES_TABLE)?;
            table.retain(|_, _| false)?;
            for entity in entities {
                let json = serde_json::to_vec(entity)?;
                table.insert(entity.id.as_str(), json.as_slice())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// One entity by id, if it exists and is publicly visible.
    pub fn public_entity(&self, id: &str) -> Result<Option<GeoEntity>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ENTITIES_TABLE)?;

        let Some(value) = table.get(id)? else {
            return Ok(None);
        };
        let entity: GeoEntity = serde_json::from_slice(value.value())?;
        Ok(entity.status.is_public().then_some(entity))
    }

    /// Published distributors and approved clinics, optionally narrowed to
    /// one kind, ordered by name.
    pub fn public_entities(&self, kind: Option<EntityKind>) -> Result<Vec<GeoEntity>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ENTITIES_TABLE)?;

        let mut entities = Vec::new();
        for row in table.iter()? {
            let (_, value) = row?;
            let entity: GeoEntity = serde_json::from_slice(value.value())?;
            if entity.status.is_public() && kind.is_none_or(|k| entity.kind == k) {
                entities.push(entity);
            }
        }
        entities.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(entities)
    }

    pub fn count(&self) -> Result<u64, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ENTITIES_TABLE)?;
        Ok(table.len()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geodir_shared::models::EntityStatus;

    fn entity(id: &str, name: &str, kind: EntityKind, status: EntityStatus) -> GeoEntity {
        GeoEntity {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            status,
            city: None,
            state_region: None,
            country: None,
            postal_code: None,
            legacy_lat: Some(41.88),
            legacy_lng: Some(-87.63),
            locations: Vec::new(),
            countries: Vec::new(),
            priority_rank: 0,
        }
    }

    fn open_temp() -> (tempfile::TempDir, Arc<Storage>) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(&dir.path().join("entities.redb")).unwrap();
        (dir, storage)
    }

    #[test]
    fn test_public_entity_by_id() {
        let (_dir, storage) = open_temp();
        let e = entity("d-1", "Acme", EntityKind::Distributor, EntityStatus::Published);
        storage
            .replace_all(&[
                e.clone(),
                entity("c-9", "Queued", EntityKind::Clinic, EntityStatus::Pending),
            ])
            .unwrap();
        assert_eq!(storage.public_entity("d-1").unwrap(), Some(e));
        assert!(storage.public_entity("c-9").unwrap().is_none());
        assert!(storage.public_entity("missing").unwrap().is_none());
        assert_eq!(storage.count().unwrap(), 2);
    }

    #[test]
    fn test_public_entities_filter_status_and_kind() {
        let (_dir, storage) = open_temp();
        storage
            .replace_all(&[
                entity("d-2", "zeta supply", EntityKind::Distributor, EntityStatus::Published),
                entity("d-1", "Alpha Supply", EntityKind::Distributor, EntityStatus::Published),
                entity("d-3", "Hidden", EntityKind::Distributor, EntityStatus::Unpublished),
                entity("c-1", "Clinic One", EntityKind::Clinic, EntityStatus::Approved),
                entity("c-2", "Clinic Two", EntityKind::Clinic, EntityStatus::Pending),
            ])
            .unwrap();

        let all: Vec<String> = storage
            .public_entities(None)
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(all, vec!["d-1", "c-1", "d-2"]);

        let clinics = storage.public_entities(Some(EntityKind::Clinic)).unwrap();
        assert_eq!(clinics.len(), 1);
        assert_eq!(clinics[0].id, "c-1");
    }

    #[test]
    fn test_replace_all_drops_previous_rows() {
        let (_dir, storage) = open_temp();
        storage
            .replace_all(&[entity("old", "Old", EntityKind::Clinic, EntityStatus::Approved)])
            .unwrap();
        storage
            .replace_all(&[entity("new", "New", EntityKind::Clinic, EntityStatus::Approved)])
            .unwrap();
        assert_eq!(storage.count().unwrap(), 1);
        assert!(storage.public_entity("old").unwrap().is_none());
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entities.redb");
        {
            let storage = Storage::open(&path).unwrap();
            storage
                .replace_all(&[entity("d-1", "Acme", EntityKind::Distributor, EntityStatus::Published)])
                .unwrap();
        }
        let storage = Storage::open(&path).unwrap();
        assert_eq!(storage.count().unwrap(), 1);
    }
}
