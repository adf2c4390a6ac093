//! Booking submission pipeline
//!
//! Turns a multipart checkout payload into a persisted booking:
//!
//! 1. re-validate the customer fields, item references and rental period;
//! 2. upload both documents (any failure aborts before a record exists);
//! 3. store the booking as `Pending` with the document URLs;
//! 4. re-read it with catalog references populated and compute the total
//!    from the stored catalog rates, then persist the total;
//! 5. queue the admin and customer emails.
//!
//! A total sent by the client is never read.

use axum::extract::Multipart;
use chrono::Utc;
use uuid::Uuid;

use crate::database::{self, AppState};
use crate::error::{AppError, AppResult};
use crate::model::{Booking, BookingStatus, BookingUpdate, Category, CustomerDetails, PopulatedBooking, RentalDateRange};
use crate::notify::{self, BookingDocuments};
use crate::pricing;
use crate::storage::{upload_key, UploadPurpose};
use crate::validation::{self, check_email, check_phone, check_required, Attachment, BookingForm};

/// A checkout payload as received from the storefront
#[derive(Debug, Clone, Default)]
pub struct BookingSubmission {
    pub form: BookingForm,

    /// Camera ids, one entry per rented unit
    pub cameras: Vec<String>,

    /// Accessory ids, one entry per rented unit
    pub accessories: Vec<String>,

    pub rental_period: String,
}

impl BookingSubmission {
    /// Reads the multipart fields of `POST /api/bookings`
    ///
    /// Unknown fields (including any client-computed total) are skipped.
    /// An empty file part counts as no file.
    pub async fn from_multipart(mut multipart: Multipart) -> AppResult<Self> {
        let mut submission = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "idProof" | "userPhoto" => {
                    let file_name = field.file_name().unwrap_or("upload").to_string();
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let bytes = field.bytes().await?;
                    let attachment = (!bytes.is_empty()).then(|| Attachment {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                    if name == "idProof" {
                        submission.form.id_proof = attachment;
                    } else {
                        submission.form.user_photo = attachment;
                    }
                }
                "fullName" => submission.form.full_name = field.text().await?,
                "email" => submission.form.email = field.text().await?,
                "contact" => submission.form.contact = field.text().await?,
                "address" => submission.form.address = field.text().await?,
                "emergencyContact" => submission.form.emergency_contact = field.text().await?,
                "rentalPeriod" => submission.rental_period = field.text().await?,
                "cameras" => push_id(&mut submission.cameras, field.text().await?),
                "accessories" => push_id(&mut submission.accessories, field.text().await?),
                other => tracing::debug!(field = other, "Ignoring unexpected booking field"),
            }
        }

        Ok(submission)
    }
}

fn push_id(ids: &mut Vec<String>, raw: String) {
    let id = raw.trim();
    if !id.is_empty() {
        ids.push(id.to_string());
    }
}

/// A freshly created booking plus the WhatsApp text for the response
#[derive(Debug, Clone)]
pub struct CreatedBooking {
    pub booking: PopulatedBooking,
    pub whatsapp_message: String,
}

/// Checks everything that can be checked before uploading
///
/// Returns the rental day count on success.
pub fn check_submission(state: &AppState, submission: &BookingSubmission) -> AppResult<i64> {
    let mut errors = validation::validate(&submission.form).messages();

    if submission.cameras.is_empty() && submission.accessories.is_empty() {
        errors.push("At least one camera or accessory is required".to_string());
    }

    let day_count = match RentalDateRange::parse_period(&submission.rental_period) {
        Some(range) if range.day_count() > 0 => range.day_count(),
        Some(_) => {
            errors.push("Rental period must span at least one day".to_string());
            0
        }
        None => {
            errors.push("Rental period must look like YYYY-MM-DD to YYYY-MM-DD".to_string());
            0
        }
    };

    errors.extend(unknown_items(state, &submission.cameras, &submission.accessories)?);

    if errors.is_empty() {
        Ok(day_count)
    } else {
        Err(AppError::Validation(errors))
    }
}

/// One message per referenced id that is not in the catalog
fn unknown_items(state: &AppState, cameras: &[String], accessories: &[String]) -> AppResult<Vec<String>> {
    let mut errors = Vec::new();
    for (category, ids) in [(Category::Camera, cameras), (Category::Accessory, accessories)] {
        for id in database::missing_items(&state.db, category, ids)? {
            errors.push(format!("Unknown {}: {}", category.label().to_lowercase(), id));
        }
    }
    Ok(errors)
}

/// Server-side total for a populated booking
pub fn compute_total(booking: &PopulatedBooking) -> u64 {
    let lines = pricing::lines_from_items(booking.cameras.iter().chain(&booking.accessories));
    pricing::quote(&lines, booking.day_count()).total
}

/// Runs the whole submission pipeline
pub async fn create_booking(state: &AppState, submission: BookingSubmission) -> AppResult<CreatedBooking> {
    check_submission(state, &submission)?;

    let BookingSubmission {
        form,
        cameras,
        accessories,
        rental_period,
    } = submission;
    let (Some(id_proof), Some(user_photo)) = (form.id_proof, form.user_photo) else {
        return Err(AppError::Validation(vec!["Both documents are required".to_string()]));
    };

    let now = Utc::now();
    let id_proof_url = state
        .storage
        .upload(&upload_key(&form.full_name, UploadPurpose::IdProof, now), &id_proof)
        .await?;
    let user_photo_url = state
        .storage
        .upload(&upload_key(&form.full_name, UploadPurpose::UserPhoto, now), &user_photo)
        .await?;

    let booking = Booking {
        id: Uuid::new_v4().to_string(),
        customer: CustomerDetails {
            full_name: form.full_name.trim().to_string(),
            email: form.email.trim().to_string(),
            contact: validation::normalize_phone(&form.contact),
            address: form.address.trim().to_string(),
            emergency_contact: validation::normalize_phone(&form.emergency_contact),
        },
        id_proof_url,
        user_photo_url,
        cameras,
        accessories,
        rental_period: rental_period.trim().to_string(),
        total_amount: 0,
        status: BookingStatus::Pending,
        created_at: now,
        updated_at: now,
    };
    database::put_booking(&state.db, &booking)?;

    let stored = database::get_booking(&state.db, &booking.id)?
        .ok_or_else(|| AppError::Internal(format!("booking {} vanished after insert", booking.id)))?;
    let mut populated = database::populate(&state.db, stored.clone())?;
    let total = compute_total(&populated);

    database::put_booking(
        &state.db,
        &Booking {
            total_amount: total,
            ..stored
        },
    )?;
    populated.total_amount = total;

    tracing::info!(
        booking_id = %populated.id,
        customer = %populated.customer.full_name,
        cameras = populated.cameras.len(),
        accessories = populated.accessories.len(),
        total,
        "Booking created"
    );

    let documents = BookingDocuments {
        id_proof: Some(&id_proof),
        user_photo: Some(&user_photo),
    };
    if let Some(email) = notify::admin_email(&populated, documents, &state.branding) {
        state.notifications.enqueue(email);
    }
    state
        .notifications
        .enqueue(notify::customer_email(&populated, &state.branding));

    Ok(CreatedBooking {
        whatsapp_message: notify::whatsapp_message(&populated, &state.branding),
        booking: populated,
    })
}

/// What an admin edit changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// The booking moved into `Confirmed` with this edit
    pub newly_confirmed: bool,
    pub period_changed: bool,
}

/// Applies an admin update to a loaded booking in memory
///
/// On a validation error the status is left alone and the caller discards
/// the partly edited copy.
pub fn apply_update(booking: &mut Booking, update: BookingUpdate) -> AppResult<UpdateOutcome> {
    let mut errors = Vec::new();
    let customer = &mut booking.customer;

    if let Some(full_name) = update.full_name {
        match check_required(&full_name, "Full name is required") {
            Some(message) => errors.push(message.to_string()),
            None => customer.full_name = full_name.trim().to_string(),
        }
    }
    if let Some(email) = update.email {
        match check_email(&email) {
            Some(message) => errors.push(message.to_string()),
            None => customer.email = email.trim().to_string(),
        }
    }
    if let Some(contact) = update.contact {
        match check_phone(&contact, "Contact number is required") {
            Some(message) => errors.push(message.to_string()),
            None => customer.contact = validation::normalize_phone(&contact),
        }
    }
    if let Some(address) = update.address {
        match check_required(&address, "Address is required") {
            Some(message) => errors.push(message.to_string()),
            None => customer.address = address.trim().to_string(),
        }
    }
    if let Some(emergency_contact) = update.emergency_contact {
        match check_phone(&emergency_contact, "Emergency contact is required") {
            Some(message) => errors.push(message.to_string()),
            None => customer.emergency_contact = validation::normalize_phone(&emergency_contact),
        }
    }
    let mut period_changed = false;
    if let Some(rental_period) = update.rental_period {
        match RentalDateRange::parse_period(&rental_period) {
            Some(range) if range.day_count() > 0 => {
                let rental_period = rental_period.trim();
                period_changed = rental_period != booking.rental_period;
                booking.rental_period = rental_period.to_string();
            }
            _ => errors.push("Rental period must span at least one day".to_string()),
        }
    }

    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let newly_confirmed = update.status == Some(BookingStatus::Confirmed)
        && booking.status != BookingStatus::Confirmed;
    if let Some(status) = update.status {
        booking.status = status;
    }
    booking.updated_at = Utc::now();

    Ok(UpdateOutcome {
        newly_confirmed,
        period_changed,
    })
}

/// Applies an admin edit and persists it
///
/// The stored total only moves when the rental period does. Re-pricing
/// needs every referenced item to still be in the catalog; otherwise the
/// edit is rejected and nothing is written.
pub fn update_booking(
    state: &AppState,
    mut booking: Booking,
    update: BookingUpdate,
) -> AppResult<(PopulatedBooking, UpdateOutcome)> {
    let outcome = apply_update(&mut booking, update)?;

    if outcome.period_changed {
        let errors = unknown_items(state, &booking.cameras, &booking.accessories)?;
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }
    }

    let mut populated = database::populate(&state.db, booking.clone())?;
    if outcome.period_changed {
        booking.total_amount = compute_total(&populated);
        populated.total_amount = booking.total_amount;
    }
    database::put_booking(&state.db, &booking)?;

    Ok((populated, outcome))
}
