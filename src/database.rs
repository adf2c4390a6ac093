//! Database initialization, table definitions and record access
//!
//! Records live in an embedded redb file. Each table maps a record id to
//! the record's JSON encoding. Catalog references on a booking are plain
//! ids; [`populate`] resolves them against the catalog tables inside a
//! single read transaction.

use std::sync::Arc;
use std::time::Instant;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::Config;
use crate::dispatch::NotificationQueue;
use crate::error::AppResult;
use crate::model::{Booking, CatalogItem, Category, PopulatedBooking};
use crate::notify::Branding;
use crate::storage::ObjectStorage;

/// Cameras, keyed by id
pub const TABLE_CAMERAS: TableDefinition<&str, &str> = TableDefinition::new("cameras_v1");

/// Accessories, keyed by id
pub const TABLE_ACCESSORIES: TableDefinition<&str, &str> = TableDefinition::new("accessories_v1");

/// Bookings, keyed by id
pub const TABLE_BOOKINGS: TableDefinition<&str, &str> = TableDefinition::new("bookings_v1");

type JsonTable = TableDefinition<'static, &'static str, &'static str>;

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    /// Thread-safe reference to the embedded database
    pub db: Arc<Database>,

    pub config: Arc<Config>,

    pub branding: Arc<Branding>,

    /// Destination of uploaded booking documents
    pub storage: Arc<dyn ObjectStorage>,

    /// Outbound email queue drained by the dispatcher task
    pub notifications: NotificationQueue,

    /// Process start, for the health endpoint's uptime
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        db: Database,
        config: Config,
        storage: Arc<dyn ObjectStorage>,
        notifications: NotificationQueue,
    ) -> Self {
        Self {
            db: Arc::new(db),
            branding: Arc::new(Branding::from_config(&config)),
            config: Arc::new(config),
            storage,
            notifications,
            started_at: Instant::now(),
        }
    }
}

/// Creates or opens the database file and makes sure every table exists
pub fn init_db(db_path: &str) -> Result<Database, redb::Error> {
    let db = Database::create(db_path)?;

    let write_txn = db.begin_write()?;
    {
        write_txn.open_table(TABLE_CAMERAS)?;
        write_txn.open_table(TABLE_ACCESSORIES)?;
        write_txn.open_table(TABLE_BOOKINGS)?;
    }
    write_txn.commit()?;

    Ok(db)
}

fn catalog_table(category: Category) -> JsonTable {
    match category {
        Category::Camera => TABLE_CAMERAS,
        Category::Accessory => TABLE_ACCESSORIES,
    }
}

fn get_record<T: DeserializeOwned>(
    db: &Database,
    table: JsonTable,
    id: &str,
) -> AppResult<Option<T>> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(table)?;
    match table.get(id)? {
        Some(guard) => Ok(Some(serde_json::from_str(guard.value())?)),
        None => Ok(None),
    }
}

fn list_records<T: DeserializeOwned>(
    db: &Database,
    table: JsonTable,
) -> AppResult<Vec<T>> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(table)?;
    let mut records = Vec::new();
    for entry in table.iter()? {
        let (_, value) = entry?;
        records.push(serde_json::from_str(value.value())?);
    }
    Ok(records)
}

fn put_record<T: Serialize>(
    db: &Database,
    table: JsonTable,
    id: &str,
    record: &T,
) -> AppResult<()> {
    let record_json = serde_json::to_string(record)?;
    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(table)?;
        table.insert(id, record_json.as_str())?;
    }
    write_txn.commit()?;
    Ok(())
}

fn remove_record(db: &Database, table: JsonTable, id: &str) -> AppResult<bool> {
    let write_txn = db.begin_write()?;
    let removed = {
        let mut table = write_txn.open_table(table)?;
        let removed = table.remove(id)?.is_some();
        removed
    };
    write_txn.commit()?;
    Ok(removed)
}

/// All items of a category, oldest first
pub fn list_items(db: &Database, category: Category) -> AppResult<Vec<CatalogItem>> {
    let mut items: Vec<CatalogItem> = list_records(db, catalog_table(category))?;
    items.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    Ok(items)
}

pub fn get_item(db: &Database, category: Category, id: &str) -> AppResult<Option<CatalogItem>> {
    get_record(db, catalog_table(category), id)
}

/// Inserts or replaces a catalog item
pub fn put_item(db: &Database, item: &CatalogItem) -> AppResult<()> {
    put_record(db, catalog_table(item.category), &item.id, item)
}

/// Returns `false` when the item did not exist
pub fn delete_item(db: &Database, category: Category, id: &str) -> AppResult<bool> {
    remove_record(db, catalog_table(category), id)
}

/// Ids from `ids` that have no record in the category's table
pub fn missing_items(db: &Database, category: Category, ids: &[String]) -> AppResult<Vec<String>> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(catalog_table(category))?;
    let mut missing = Vec::new();
    for id in ids {
        if table.get(id.as_str())?.is_none() && !missing.contains(id) {
            missing.push(id.clone());
        }
    }
    Ok(missing)
}

/// All bookings, newest first
pub fn list_bookings(db: &Database) -> AppResult<Vec<Booking>> {
    let mut bookings: Vec<Booking> = list_records(db, TABLE_BOOKINGS)?;
    bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(bookings)
}

pub fn get_booking(db: &Database, id: &str) -> AppResult<Option<Booking>> {
    get_record(db, TABLE_BOOKINGS, id)
}

/// Inserts or replaces a booking
pub fn put_booking(db: &Database, booking: &Booking) -> AppResult<()> {
    put_record(db, TABLE_BOOKINGS, &booking.id, booking)
}

pub fn delete_booking(db: &Database, id: &str) -> AppResult<bool> {
    remove_record(db, TABLE_BOOKINGS, id)
}

/// Resolves a booking's catalog references
///
/// References to items deleted from the catalog since the booking was
/// made are dropped from the result and logged.
pub fn populate(db: &Database, booking: Booking) -> AppResult<PopulatedBooking> {
    let read_txn = db.begin_read()?;
    let cameras_table = read_txn.open_table(TABLE_CAMERAS)?;
    let accessories_table = read_txn.open_table(TABLE_ACCESSORIES)?;

    let cameras = resolve_items(&cameras_table, &booking.cameras, &booking.id)?;
    let accessories = resolve_items(&accessories_table, &booking.accessories, &booking.id)?;

    Ok(booking.populate(cameras, accessories))
}

fn resolve_items(
    table: &impl ReadableTable<&'static str, &'static str>,
    ids: &[String],
    booking_id: &str,
) -> AppResult<Vec<CatalogItem>> {
    let mut items = Vec::with_capacity(ids.len());
    for id in ids {
        match table.get(id.as_str())? {
            Some(guard) => items.push(serde_json::from_str(guard.value())?),
            None => tracing::warn!(
                booking_id,
                item_id = %id,
                "Booking references a catalog item that no longer exists"
            ),
        }
    }
    Ok(items)
}

/// Populates every booking against one consistent catalog view
pub fn populate_all(db: &Database, bookings: Vec<Booking>) -> AppResult<Vec<PopulatedBooking>> {
    let read_txn = db.begin_read()?;
    let cameras_table = read_txn.open_table(TABLE_CAMERAS)?;
    let accessories_table = read_txn.open_table(TABLE_ACCESSORIES)?;

    bookings
        .into_iter()
        .map(|booking| {
            let cameras = resolve_items(&cameras_table, &booking.cameras, &booking.id)?;
            let accessories = resolve_items(&accessories_table, &booking.accessories, &booking.id)?;
            Ok(booking.populate(cameras, accessories))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BookingStatus, CatalogItemInput, CustomerDetails};
    use chrono::Utc;
    use tempfile::NamedTempFile;

    fn temp_db() -> (Database, NamedTempFile) {
        let file = NamedTempFile::new().unwrap();
        let db = init_db(file.path().to_str().unwrap()).unwrap();
        (db, file)
    }

    fn item(id: &str, category: Category) -> CatalogItem {
        CatalogItem::new(
            id.to_string(),
            category,
            CatalogItemInput {
                name: id.to_string(),
                price_per_day: 100,
                ..Default::default()
            },
        )
    }

    fn booking(cameras: Vec<String>) -> Booking {
        Booking {
            id: "b-1".to_string(),
            customer: CustomerDetails {
                full_name: "Asha Rao".to_string(),
                email: "asha@example.com".to_string(),
                contact: "9876543210".to_string(),
                address: "Pune".to_string(),
                emergency_contact: "9123456780".to_string(),
            },
            id_proof_url: String::new(),
            user_photo_url: String::new(),
            cameras,
            accessories: Vec::new(),
            rental_period: "2025-01-10 to 2025-01-11 (1 days)".to_string(),
            total_amount: 0,
            status: BookingStatus::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_catalog_round_trip_per_category() {
        let (db, _file) = temp_db();
        put_item(&db, &item("fx3", Category::Camera)).unwrap();

        assert!(get_item(&db, Category::Camera, "fx3").unwrap().is_some());
        assert!(get_item(&db, Category::Accessory, "fx3").unwrap().is_none());
        assert_eq!(list_items(&db, Category::Camera).unwrap().len(), 1);

        assert!(delete_item(&db, Category::Camera, "fx3").unwrap());
        assert!(!delete_item(&db, Category::Camera, "fx3").unwrap());
    }

    #[test]
    fn test_missing_items_reports_each_unknown_id_once() {
        let (db, _file) = temp_db();
        put_item(&db, &item("fx3", Category::Camera)).unwrap();

        let ids = vec!["fx3".to_string(), "ghost".to_string(), "ghost".to_string()];
        assert_eq!(
            missing_items(&db, Category::Camera, &ids).unwrap(),
            vec!["ghost".to_string()]
        );
    }

    #[test]
    fn test_populate_keeps_repeats_and_skips_deleted() {
        let (db, _file) = temp_db();
        put_item(&db, &item("fx3", Category::Camera)).unwrap();

        let stored = booking(vec!["fx3".into(), "fx3".into(), "gone".into()]);
        put_booking(&db, &stored).unwrap();

        let populated = populate(&db, get_booking(&db, "b-1").unwrap().unwrap()).unwrap();
        assert_eq!(populated.cameras.len(), 2);
        assert!(populated.cameras.iter().all(|camera| camera.id == "fx3"));
    }

    #[test]
    fn test_populate_all_keeps_order() {
        let (db, _file) = temp_db();
        put_item(&db, &item("fx3", Category::Camera)).unwrap();
        put_item(&db, &item("a7s", Category::Camera)).unwrap();

        let first = booking(vec!["fx3".into()]);
        let second = Booking {
            id: "b-2".to_string(),
            ..booking(vec!["a7s".into(), "gone".into()])
        };

        let populated = populate_all(&db, vec![first, second]).unwrap();
        assert_eq!(populated.len(), 2);
        assert_eq!(populated[0].cameras[0].id, "fx3");
        assert_eq!(populated[1].id, "b-2");
        assert_eq!(populated[1].cameras.len(), 1);
        assert_eq!(populated[1].cameras[0].id, "a7s");
    }
}
