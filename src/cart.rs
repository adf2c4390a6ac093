//! Client-side cart state
//!
//! The cart holds catalog snapshots with quantities plus the selected
//! rental dates. Every mutation is written through to a
//! [`CartPersistence`] backend before the call returns, so a reload picks
//! up exactly where the shopper left off. The store has a single writer;
//! two stores sharing one backend overwrite each other (last write wins).

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{CatalogItem, Category, RentalDateRange};
use crate::notice::Notice;
use crate::pricing::{self, PriceLine, Quote};

/// Most units of one item a single cart line can hold
pub const MAX_LINE_QUANTITY: u32 = 99;

/// A catalog item in the cart
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CartLine {
    pub item: CatalogItem,

    /// Between 1 and [`MAX_LINE_QUANTITY`]; a line reaching 0 is removed
    pub quantity: u32,
}

/// Everything the cart persists
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct CartSnapshot {
    pub lines: Vec<CartLine>,
    pub dates: RentalDateRange,
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("cart storage I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("cart storage holds invalid data: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Durable storage for the cart snapshot
pub trait CartPersistence {
    /// Returns `None` when nothing has been saved yet
    fn load(&self) -> Result<Option<CartSnapshot>, PersistError>;

    fn save(&self, snapshot: &CartSnapshot) -> Result<(), PersistError>;
}

/// Stores the snapshot as a single JSON file
#[derive(Debug, Clone)]
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CartPersistence for JsonFilePersistence {
    fn load(&self) -> Result<Option<CartSnapshot>, PersistError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, snapshot: &CartSnapshot) -> Result<(), PersistError> {
        let raw = serde_json::to_string(snapshot)?;
        fs::write(&self.path, raw)?;
        Ok(())
    }
}

/// Keeps the snapshot in memory only
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    snapshot: Mutex<Option<CartSnapshot>>,
}

impl CartPersistence for MemoryPersistence {
    fn load(&self) -> Result<Option<CartSnapshot>, PersistError> {
        Ok(self
            .snapshot
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default())
    }

    fn save(&self, snapshot: &CartSnapshot) -> Result<(), PersistError> {
        if let Ok(mut guard) = self.snapshot.lock() {
            *guard = Some(snapshot.clone());
        }
        Ok(())
    }
}

/// What the cart page should offer the shopper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutSummary {
    /// Nothing in the cart
    Empty,

    /// Items present but no valid period; shows "₹X/day, select dates"
    SelectRentalPeriod { per_day_subtotal: u64 },

    /// Checkout may proceed
    Ready { day_count: i64, quote: Quote },
}

/// The cart and its derived totals
#[derive(Debug)]
pub struct CartStore<P: CartPersistence> {
    snapshot: CartSnapshot,
    quote: Quote,
    persistence: P,
}

impl<P: CartPersistence> CartStore<P> {
    /// Opens the cart, restoring any saved snapshot
    ///
    /// Unreadable saved state is discarded with a warning.
    pub fn open(persistence: P) -> Self {
        let mut snapshot = match persistence.load() {
            Ok(saved) => saved.unwrap_or_default(),
            Err(err) => {
                tracing::warn!(error = %err, "Discarding unreadable cart state");
                CartSnapshot::default()
            }
        };
        snapshot.lines.retain(|line| line.quantity > 0);
        for line in &mut snapshot.lines {
            line.quantity = line.quantity.min(MAX_LINE_QUANTITY);
        }
        let mut store = Self {
            snapshot,
            quote: Quote::default(),
            persistence,
        };
        store.recompute();
        store
    }

    /// Adds one unit of `item`, merging with an existing line
    pub fn add_item(&mut self, item: &CatalogItem) -> Notice {
        match self.line_mut(&item.id) {
            Some(line) if line.quantity >= MAX_LINE_QUANTITY => {
                return Notice::info(format!(
                    "You can rent at most {} of {}.",
                    MAX_LINE_QUANTITY, item.name
                ));
            }
            Some(line) => line.quantity += 1,
            None => self.snapshot.lines.push(CartLine {
                item: item.clone(),
                quantity: 1,
            }),
        }
        self.commit();
        Notice::success(format!("{} added to cart!", item.name))
    }

    /// Sets a line's quantity; zero or below removes the line and anything
    /// above [`MAX_LINE_QUANTITY`] is capped
    pub fn update_quantity(&mut self, id: &str, new_quantity: i64) {
        if new_quantity <= 0 {
            self.snapshot.lines.retain(|line| line.item.id != id);
        } else if let Some(line) = self.line_mut(id) {
            line.quantity = u32::try_from(new_quantity.min(i64::from(MAX_LINE_QUANTITY)))
                .unwrap_or(MAX_LINE_QUANTITY);
        }
        self.commit();
    }

    /// Removes a line entirely
    pub fn remove_item(&mut self, id: &str) -> Notice {
        let name = self
            .snapshot
            .lines
            .iter()
            .find(|line| line.item.id == id)
            .map(|line| line.item.name.clone())
            .unwrap_or_else(|| "Item".to_string());
        self.snapshot.lines.retain(|line| line.item.id != id);
        self.commit();
        Notice::error(format!("{} removed from cart.", name))
    }

    /// Empties the cart and resets the rental dates together
    pub fn clear(&mut self) {
        self.snapshot = CartSnapshot::default();
        self.commit();
    }

    /// Merges the given dates into the current range
    pub fn set_date_range(&mut self, range: RentalDateRange) {
        self.snapshot.dates.merge(range);
        self.commit();
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.snapshot.lines
    }

    pub fn dates(&self) -> RentalDateRange {
        self.snapshot.dates
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.lines.is_empty()
    }

    /// Rental days of the selected range, 0 when invalid
    pub fn day_count(&self) -> i64 {
        self.snapshot.dates.day_count()
    }

    /// Σ effective rate × quantity
    pub fn daily_subtotal(&self) -> u64 {
        self.quote.per_day_subtotal
    }

    /// Σ quantities
    pub fn line_item_count(&self) -> u32 {
        self.snapshot
            .lines
            .iter()
            .fold(0u32, |count, line| count.saturating_add(line.quantity))
    }

    /// Daily subtotal × day count
    pub fn estimated_total(&self) -> u64 {
        self.quote.total
    }

    pub fn can_checkout(&self) -> bool {
        !self.is_empty() && self.day_count() > 0
    }

    pub fn checkout_summary(&self) -> CheckoutSummary {
        if self.is_empty() {
            CheckoutSummary::Empty
        } else if self.day_count() <= 0 {
            CheckoutSummary::SelectRentalPeriod {
                per_day_subtotal: self.quote.per_day_subtotal,
            }
        } else {
            CheckoutSummary::Ready {
                day_count: self.day_count(),
                quote: self.quote,
            }
        }
    }

    /// Ids of the items in `category`, repeated once per unit
    pub fn unit_ids(&self, category: Category) -> Vec<String> {
        self.snapshot
            .lines
            .iter()
            .filter(|line| line.item.category == category)
            .flat_map(|line| {
                std::iter::repeat(line.item.id.clone()).take(line.quantity as usize)
            })
            .collect()
    }

    fn line_mut(&mut self, id: &str) -> Option<&mut CartLine> {
        self.snapshot.lines.iter_mut().find(|line| line.item.id == id)
    }

    fn recompute(&mut self) {
        let lines: Vec<PriceLine> = self
            .snapshot
            .lines
            .iter()
            .map(|line| PriceLine {
                rate: line.item.effective_rate(),
                quantity: line.quantity,
            })
            .collect();
        self.quote = pricing::quote(&lines, self.day_count());
    }

    fn commit(&mut self) {
        self.recompute();
        if let Err(err) = self.persistence.save(&self.snapshot) {
            tracing::warn!(error = %err, "Failed to persist cart state");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CatalogItemInput;
    use crate::notice::NoticeKind;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn item(id: &str, name: &str, category: Category, price: u64, offer: Option<u64>) -> CatalogItem {
        CatalogItem::new(
            id.to_string(),
            category,
            CatalogItemInput {
                name: name.to_string(),
                price_per_day: price,
                offer_price: offer,
                ..Default::default()
            },
        )
    }

    fn fx3() -> CatalogItem {
        item("fx3", "Sony FX3", Category::Camera, 2000, None)
    }

    fn tripod() -> CatalogItem {
        item("tripod", "Tripod", Category::Accessory, 300, Some(250))
    }

    fn range(start: &str, end: &str) -> RentalDateRange {
        RentalDateRange::new(
            NaiveDate::parse_from_str(start, "%Y-%m-%d").unwrap(),
            NaiveDate::parse_from_str(end, "%Y-%m-%d").unwrap(),
        )
    }

    #[test]
    fn test_adding_twice_merges_lines() {
        let mut cart = CartStore::open(MemoryPersistence::default());
        let notice = cart.add_item(&fx3());
        cart.add_item(&fx3());

        assert_eq!(notice.kind, NoticeKind::Success);
        assert_eq!(notice.message, "Sony FX3 added to cart!");
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 2);
        assert_eq!(cart.line_item_count(), 2);
    }

    #[test]
    fn test_update_quantity_to_zero_removes_line() {
        let mut cart = CartStore::open(MemoryPersistence::default());
        cart.add_item(&fx3());
        cart.add_item(&tripod());
        cart.update_quantity("tripod", 3);
        assert_eq!(cart.line_item_count(), 4);

        cart.update_quantity("tripod", 0);
        assert_eq!(cart.line_item_count(), 1);
        assert!(cart.lines().iter().all(|line| line.item.id != "tripod"));

        cart.update_quantity("fx3", -1);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_quantity_is_capped() {
        let mut cart = CartStore::open(MemoryPersistence::default());
        cart.add_item(&fx3());
        cart.update_quantity("fx3", i64::MAX);
        assert_eq!(cart.lines()[0].quantity, MAX_LINE_QUANTITY);

        let notice = cart.add_item(&fx3());
        assert_eq!(notice.kind, NoticeKind::Info);
        assert_eq!(cart.line_item_count(), MAX_LINE_QUANTITY);
        assert_eq!(cart.unit_ids(Category::Camera).len(), MAX_LINE_QUANTITY as usize);
    }

    #[test]
    fn test_saved_quantities_are_clamped_on_open() {
        let persistence = MemoryPersistence::default();
        persistence
            .save(&CartSnapshot {
                lines: vec![
                    CartLine { item: fx3(), quantity: u32::MAX },
                    CartLine { item: tripod(), quantity: 0 },
                ],
                dates: RentalDateRange::default(),
            })
            .unwrap();

        let cart = CartStore::open(persistence);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.line_item_count(), MAX_LINE_QUANTITY);
    }

    #[test]
    fn test_remove_item_names_the_item() {
        let mut cart = CartStore::open(MemoryPersistence::default());
        cart.add_item(&tripod());

        let notice = cart.remove_item("tripod");
        assert_eq!(notice.kind, NoticeKind::Error);
        assert_eq!(notice.message, "Tripod removed from cart.");
        assert_eq!(cart.remove_item("tripod").message, "Item removed from cart.");
    }

    #[test]
    fn test_estimated_total_for_three_days() {
        let mut cart = CartStore::open(MemoryPersistence::default());
        cart.add_item(&fx3());
        cart.add_item(&tripod());
        cart.add_item(&tripod());
        cart.set_date_range(range("2025-01-10", "2025-01-13"));

        assert_eq!(cart.day_count(), 3);
        assert_eq!(cart.daily_subtotal(), 2500);
        assert_eq!(cart.estimated_total(), 7500);
        assert!(cart.can_checkout());
    }

    #[test]
    fn test_same_day_range_asks_for_dates() {
        let mut cart = CartStore::open(MemoryPersistence::default());
        cart.add_item(&fx3());
        cart.set_date_range(range("2025-01-10", "2025-01-10"));

        assert_eq!(cart.day_count(), 0);
        assert_eq!(cart.estimated_total(), 0);
        assert!(!cart.can_checkout());
        assert_eq!(
            cart.checkout_summary(),
            CheckoutSummary::SelectRentalPeriod {
                per_day_subtotal: 2000
            }
        );
    }

    #[test]
    fn test_clear_resets_lines_and_dates() {
        let mut cart = CartStore::open(MemoryPersistence::default());
        cart.add_item(&fx3());
        cart.set_date_range(range("2025-01-10", "2025-01-12"));

        cart.clear();
        assert!(cart.is_empty());
        assert!(cart.dates().is_blank());
        assert_eq!(cart.checkout_summary(), CheckoutSummary::Empty);
    }

    #[test]
    fn test_unit_ids_repeat_per_quantity() {
        let mut cart = CartStore::open(MemoryPersistence::default());
        cart.add_item(&fx3());
        cart.add_item(&tripod());
        cart.update_quantity("tripod", 2);

        assert_eq!(cart.unit_ids(Category::Camera), vec!["fx3".to_string()]);
        assert_eq!(
            cart.unit_ids(Category::Accessory),
            vec!["tripod".to_string(), "tripod".to_string()]
        );
    }

    #[test]
    fn test_state_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cart.json");
        {
            let mut cart = CartStore::open(JsonFilePersistence::new(&path));
            cart.add_item(&tripod());
            cart.add_item(&tripod());
            cart.set_date_range(range("2025-01-10", "2025-01-12"));
        }

        let cart = CartStore::open(JsonFilePersistence::new(&path));
        assert_eq!(cart.line_item_count(), 2);
        assert_eq!(cart.day_count(), 2);
        assert_eq!(cart.estimated_total(), 1000);
    }

    #[test]
    fn test_corrupt_state_is_discarded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cart.json");
        fs::write(&path, "not json").unwrap();

        let cart = CartStore::open(JsonFilePersistence::new(&path));
        assert!(cart.is_empty());
    }
}
