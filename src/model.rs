//! Data models for the rental storefront
//!
//! This module defines the catalog, booking and rental-period structures
//! shared by the HTTP layer, the persistence layer and the client-side
//! cart and checkout modules. JSON field names follow the storefront's
//! camelCase wire format, with record ids exposed as `_id`.

use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

/// Image used for catalog items created without one
pub const DEFAULT_IMAGE: &str =
    "https://res.cloudinary.com/dhqhk1k3t/image/upload/v1760359879/placeholder_logo_z6ko7r.png";

/// Kind of rentable equipment
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Camera,
    Accessory,
}

impl Category {
    /// Singular display label, e.g. "Camera"
    pub fn label(self) -> &'static str {
        match self {
            Category::Camera => "Camera",
            Category::Accessory => "Accessory",
        }
    }
}

/// A rentable camera or accessory listing
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    /// Unique identifier (UUID v4)
    #[serde(rename = "_id")]
    pub id: String,

    pub category: Category,

    pub name: String,

    /// Regular daily rate in whole rupees, always > 0
    pub price_per_day: u64,

    /// Discounted daily rate, strictly below `price_per_day` when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer_price: Option<u64>,

    #[serde(default)]
    pub description: String,

    pub image: String,

    #[serde(default)]
    pub inclusions: Vec<String>,

    #[serde(default)]
    pub specs: Vec<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl CatalogItem {
    /// Builds a new item from a validated input payload
    pub fn new(id: String, category: Category, input: CatalogItemInput) -> Self {
        let now = Utc::now();
        let image = input.image_or_default();
        Self {
            id,
            category,
            name: input.name.trim().to_string(),
            price_per_day: input.price_per_day,
            offer_price: input.offer_price,
            description: input.description,
            image,
            inclusions: input.inclusions,
            specs: input.specs,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replaces every editable field, keeping id, category and creation time
    pub fn apply(&mut self, input: CatalogItemInput) {
        self.name = input.name.trim().to_string();
        self.price_per_day = input.price_per_day;
        self.offer_price = input.offer_price;
        self.image = input.image_or_default();
        self.description = input.description;
        self.inclusions = input.inclusions;
        self.specs = input.specs;
        self.updated_at = Utc::now();
    }

    /// The daily rate used for every price calculation
    ///
    /// The offer price wins only when it is actually lower than the
    /// regular rate; stored items always satisfy that, but snapshots held
    /// by a client are not re-validated.
    pub fn effective_rate(&self) -> u64 {
        match self.offer_price {
            Some(offer) if offer < self.price_per_day => offer,
            _ => self.price_per_day,
        }
    }
}

/// Create/update payload for a catalog item
///
/// # Example
/// ```json
/// {
///   "name": "Sony FX3",
///   "pricePerDay": 2000,
///   "offerPrice": 1800,
///   "description": "Full-frame cinema line camera",
///   "inclusions": ["2 batteries", "Charger"],
///   "specs": ["12MP", "4K120"]
/// }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Default, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_offer_price", skip_on_field_errors = false))]
pub struct CatalogItemInput {
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "Name is required"))]
    pub name: String,

    #[serde(default)]
    #[validate(range(min = 1, message = "Price per day must be greater than 0"))]
    pub price_per_day: u64,

    #[serde(default)]
    pub offer_price: Option<u64>,

    #[serde(default)]
    pub description: String,

    /// Optional - falls back to [`DEFAULT_IMAGE`]
    #[serde(default)]
    pub image: Option<String>,

    #[serde(default)]
    pub inclusions: Vec<String>,

    #[serde(default)]
    pub specs: Vec<String>,
}

impl CatalogItemInput {
    /// Runs the schema rules and flattens any failures into messages
    pub fn check(&self) -> Result<(), Vec<String>> {
        self.validate().map_err(|errors| validation_messages(&errors))
    }

    fn image_or_default(&self) -> String {
        self.image
            .as_deref()
            .map(str::trim)
            .filter(|image| !image.is_empty())
            .unwrap_or(DEFAULT_IMAGE)
            .to_string()
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

fn validate_offer_price(input: &CatalogItemInput) -> Result<(), ValidationError> {
    match input.offer_price {
        Some(offer) if offer >= input.price_per_day => Err(ValidationError::new("offer_price")
            .with_message(Cow::Borrowed(
                "Offer price must be lower than price per day",
            ))),
        _ => Ok(()),
    }
}

/// Flattens validator output into a sorted list of human-readable messages
pub fn validation_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |err| match &err.message {
                Some(message) => message.to_string(),
                None => format!("{} is invalid", field),
            })
        })
        .collect();
    messages.sort();
    messages
}

/// Lifecycle state of a booking
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BookingStatus::Pending => "Pending",
            BookingStatus::Confirmed => "Confirmed",
            BookingStatus::Completed => "Completed",
            BookingStatus::Cancelled => "Cancelled",
        };
        f.write_str(label)
    }
}

/// Customer contact fields shared by stored and populated bookings
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetails {
    pub full_name: String,
    pub email: String,
    pub contact: String,
    pub address: String,
    pub emergency_contact: String,
}

/// A booking as stored in the database
///
/// Camera and accessory references are catalog ids; an id repeated N
/// times means N units of that item.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(flatten)]
    pub customer: CustomerDetails,

    /// Public URL of the uploaded ID proof
    pub id_proof_url: String,

    /// Public URL of the uploaded customer photo
    pub user_photo_url: String,

    pub cameras: Vec<String>,

    pub accessories: Vec<String>,

    /// Human-readable period, e.g. "2025-01-10 to 2025-01-13 (3 days)"
    pub rental_period: String,

    /// Server-computed charge; never taken from the client
    #[serde(default)]
    pub total_amount: u64,

    #[serde(default)]
    pub status: BookingStatus,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Replaces the id references with the catalog records they point to
    pub fn populate(
        self,
        cameras: Vec<CatalogItem>,
        accessories: Vec<CatalogItem>,
    ) -> PopulatedBooking {
        PopulatedBooking {
            id: self.id,
            customer: self.customer,
            id_proof_url: self.id_proof_url,
            user_photo_url: self.user_photo_url,
            cameras,
            accessories,
            rental_period: self.rental_period,
            total_amount: self.total_amount,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// A booking with its catalog references resolved, as returned by the API
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PopulatedBooking {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(flatten)]
    pub customer: CustomerDetails,

    pub id_proof_url: String,

    pub user_photo_url: String,

    pub cameras: Vec<CatalogItem>,

    pub accessories: Vec<CatalogItem>,

    pub rental_period: String,

    pub total_amount: u64,

    pub status: BookingStatus,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl PopulatedBooking {
    /// Number of rental days encoded in the period string (0 if unparseable)
    pub fn day_count(&self) -> i64 {
        RentalDateRange::parse_period(&self.rental_period)
            .map(|range| range.day_count())
            .unwrap_or(0)
    }
}

/// Admin update payload for a booking
///
/// Every field is optional. A `totalAmount` sent by the caller is not part
/// of this struct and is therefore silently ignored.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct BookingUpdate {
    pub status: Option<BookingStatus>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    pub address: Option<String>,
    pub emergency_contact: Option<String>,
    pub rental_period: Option<String>,
}

/// Calendar range selected for a rental
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RentalDateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl RentalDateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// Whole rental days between start and end
    ///
    /// Returns 0 when either date is missing or the end is not after the
    /// start; a zero count blocks checkout.
    pub fn day_count(&self) -> i64 {
        match (self.start, self.end) {
            (Some(start), Some(end)) if end > start => (end - start).num_days(),
            _ => 0,
        }
    }

    /// Overwrites only the dates that are set in `other`
    pub fn merge(&mut self, other: RentalDateRange) {
        if other.start.is_some() {
            self.start = other.start;
        }
        if other.end.is_some() {
            self.end = other.end;
        }
    }

    pub fn is_blank(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Formats the range the way it is stored on a booking
    ///
    /// Returns `None` unless both dates are set.
    pub fn format_period(&self) -> Option<String> {
        let (start, end) = (self.start?, self.end?);
        Some(format!(
            "{} to {} ({} days)",
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d"),
            self.day_count()
        ))
    }

    /// Recovers the dates from a stored period string
    ///
    /// Only the two dates are read; the "(N days)" suffix is ignored and
    /// recomputed from them.
    pub fn parse_period(period: &str) -> Option<Self> {
        let (start, rest) = period.trim().split_once(" to ")?;
        let end = rest.split_whitespace().next()?;
        let start = NaiveDate::parse_from_str(start.trim(), "%Y-%m-%d").ok()?;
        let end = NaiveDate::parse_from_str(end, "%Y-%m-%d").ok()?;
        Some(Self::new(start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn input(name: &str, price: u64, offer: Option<u64>) -> CatalogItemInput {
        CatalogItemInput {
            name: name.to_string(),
            price_per_day: price,
            offer_price: offer,
            ..Default::default()
        }
    }

    #[test]
    fn test_effective_rate_prefers_lower_offer() {
        let item = CatalogItem::new("t".into(), Category::Accessory, input("Tripod", 300, Some(250)));
        assert_eq!(item.effective_rate(), 250);

        let mut stale = item.clone();
        stale.offer_price = Some(400);
        assert_eq!(stale.effective_rate(), 300);
    }

    #[test]
    fn test_missing_image_uses_placeholder() {
        let item = CatalogItem::new("c".into(), Category::Camera, input("Sony FX3", 2000, None));
        assert_eq!(item.image, DEFAULT_IMAGE);
    }

    #[test]
    fn test_new_item_keeps_description_and_image() {
        let item = CatalogItem::new(
            "c".into(),
            Category::Camera,
            CatalogItemInput {
                description: "Full-frame cinema camera".to_string(),
                image: Some("https://cdn.example.com/fx3.png".to_string()),
                ..input(" Sony FX3 ", 2000, None)
            },
        );
        assert_eq!(item.name, "Sony FX3");
        assert_eq!(item.description, "Full-frame cinema camera");
        assert_eq!(item.image, "https://cdn.example.com/fx3.png");
    }

    #[test]
    fn test_catalog_input_rules() {
        assert!(input("Sony FX3", 2000, Some(1800)).check().is_ok());

        let errors = input("  ", 0, None).check().unwrap_err();
        assert_eq!(
            errors,
            vec![
                "Name is required".to_string(),
                "Price per day must be greater than 0".to_string()
            ]
        );

        let errors = input("Tripod", 300, Some(300)).check().unwrap_err();
        assert_eq!(errors, vec!["Offer price must be lower than price per day".to_string()]);
    }

    #[test]
    fn test_catalog_item_json_shape() {
        let item = CatalogItem::new("abc".into(), Category::Camera, input("Sony FX3", 2000, None));
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["_id"], "abc");
        assert_eq!(json["category"], "camera");
        assert_eq!(json["pricePerDay"], 2000);
        assert!(json.get("offerPrice").is_none());
    }

    #[test]
    fn test_day_count() {
        assert_eq!(RentalDateRange::new(date("2025-01-10"), date("2025-01-13")).day_count(), 3);
        assert_eq!(RentalDateRange::new(date("2025-01-10"), date("2025-01-10")).day_count(), 0);
        assert_eq!(RentalDateRange::new(date("2025-01-10"), date("2025-01-09")).day_count(), 0);
        assert_eq!(RentalDateRange::default().day_count(), 0);
    }

    #[test]
    fn test_merge_keeps_unset_dates() {
        let mut range = RentalDateRange::new(date("2025-01-10"), date("2025-01-12"));
        range.merge(RentalDateRange {
            start: None,
            end: Some(date("2025-01-15")),
        });
        assert_eq!(range, RentalDateRange::new(date("2025-01-10"), date("2025-01-15")));
    }

    #[test]
    fn test_period_format_and_parse() {
        let range = RentalDateRange::new(date("2025-01-10"), date("2025-01-13"));
        let period = range.format_period().unwrap();
        assert_eq!(period, "2025-01-10 to 2025-01-13 (3 days)");
        assert_eq!(RentalDateRange::parse_period(&period), Some(range));

        // the suffix is not trusted
        let forged = RentalDateRange::parse_period("2025-01-10 to 2025-01-13 (30 days)").unwrap();
        assert_eq!(forged.day_count(), 3);

        assert!(RentalDateRange::parse_period("next weekend").is_none());
        assert!(RentalDateRange { start: Some(date("2025-01-10")), end: None }
            .format_period()
            .is_none());
    }

    #[test]
    fn test_booking_status_wire_format() {
        assert_eq!(serde_json::to_value(BookingStatus::Confirmed).unwrap(), "Confirmed");
        assert_eq!(BookingStatus::default(), BookingStatus::Pending);
    }
}
