//! Booking endpoints
//!
//! Submission and the WhatsApp/status derivations only need the API key;
//! listing, editing and deleting bookings also require an admin token.

use axum::{
    extract::{multipart::MultipartRejection, rejection::JsonRejection, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::AdminClaims;
use crate::booking::{self, BookingSubmission};
use crate::database::{self, AppState};
use crate::error::{AppError, AppResult};
use crate::handler::Ack;
use crate::model::{Booking, BookingStatus, BookingUpdate, PopulatedBooking};
use crate::notify;

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub success: bool,
    pub message: &'static str,
    pub booking: PopulatedBooking,
    pub whatsapp_message: String,
}

#[derive(Serialize, Debug)]
pub struct BookingListResponse {
    pub success: bool,
    pub count: usize,
    pub bookings: Vec<PopulatedBooking>,
}

#[derive(Serialize, Debug)]
pub struct BookingDetailResponse {
    pub success: bool,
    pub booking: PopulatedBooking,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct WhatsAppLinkResponse {
    pub success: bool,
    pub wa_link: String,
    pub message: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BookingStatusResponse {
    pub success: bool,
    pub status: BookingStatus,
    pub updated_at: DateTime<Utc>,
}

fn booking_not_found() -> AppError {
    AppError::NotFound("Booking not found".to_string())
}

fn load_booking(state: &AppState, id: &str) -> AppResult<Booking> {
    database::get_booking(&state.db, id)?.ok_or_else(booking_not_found)
}

fn load_populated(state: &AppState, id: &str) -> AppResult<PopulatedBooking> {
    database::populate(&state.db, load_booking(state, id)?)
}

/// Accepts a checkout submission
///
/// Expects `multipart/form-data` with the customer fields, one `cameras`
/// or `accessories` part per rented unit, `rentalPeriod`, and the two
/// files `idProof` and `userPhoto`.
///
/// # Response
///
/// - **201 Created** - `{ success, message, booking, whatsappMessage }`
/// - **400 Bad Request** - validation failed; `errors` lists every problem
/// - **502 Bad Gateway** - a document could not be uploaded; nothing stored
pub async fn create_booking(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<(StatusCode, Json<BookingResponse>)> {
    let submission = BookingSubmission::from_multipart(multipart?).await?;
    let created = booking::create_booking(&state, submission).await?;

    Ok((
        StatusCode::CREATED,
        Json(BookingResponse {
            success: true,
            message: "Booking created successfully",
            booking: created.booking,
            whatsapp_message: created.whatsapp_message,
        }),
    ))
}

/// Every booking, newest first, with catalog references populated
pub async fn list_bookings(
    State(state): State<AppState>,
    _admin: AdminClaims,
) -> AppResult<Json<BookingListResponse>> {
    let bookings = database::populate_all(&state.db, database::list_bookings(&state.db)?)?;
    Ok(Json(BookingListResponse {
        success: true,
        count: bookings.len(),
        bookings,
    }))
}

pub async fn get_booking(
    State(state): State<AppState>,
    _admin: AdminClaims,
    Path(id): Path<String>,
) -> AppResult<Json<BookingDetailResponse>> {
    Ok(Json(BookingDetailResponse {
        success: true,
        booking: load_populated(&state, &id)?,
    }))
}

/// Edits status, customer fields or rental period (admin only)
///
/// Changing the rental period re-prices the booking at current catalog
/// rates; any other edit keeps the stored total. Moving the booking into
/// `Confirmed` queues the customer confirmation email.
pub async fn update_booking(
    State(state): State<AppState>,
    admin: AdminClaims,
    Path(id): Path<String>,
    payload: Result<Json<BookingUpdate>, JsonRejection>,
) -> AppResult<Json<BookingResponse>> {
    let Json(update) = payload?;
    let stored = load_booking(&state, &id)?;
    let (populated, outcome) = booking::update_booking(&state, stored, update)?;

    tracing::info!(
        admin = %admin.sub,
        booking_id = %id,
        status = %populated.status,
        repriced = outcome.period_changed,
        "Booking updated"
    );

    if outcome.newly_confirmed {
        state
            .notifications
            .enqueue(notify::customer_email(&populated, &state.branding));
    }

    Ok(Json(BookingResponse {
        success: true,
        message: "Booking updated successfully",
        whatsapp_message: notify::whatsapp_message(&populated, &state.branding),
        booking: populated,
    }))
}

pub async fn delete_booking(
    State(state): State<AppState>,
    admin: AdminClaims,
    Path(id): Path<String>,
) -> AppResult<Json<Ack>> {
    if !database::delete_booking(&state.db, &id)? {
        return Err(booking_not_found());
    }
    tracing::info!(admin = %admin.sub, booking_id = %id, "Booking deleted");
    Ok(Json(Ack::new("Booking deleted successfully")))
}

/// The confirmation text a customer would receive on WhatsApp
pub async fn whatsapp_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Ack>> {
    let populated = load_populated(&state, &id)?;
    Ok(Json(Ack::new(notify::whatsapp_message(&populated, &state.branding))))
}

/// A `wa.me` deep link to the customer with the confirmation text prefilled
pub async fn whatsapp_link(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<WhatsAppLinkResponse>> {
    let populated = load_populated(&state, &id)?;
    let message = notify::whatsapp_message(&populated, &state.branding);
    let wa_link = notify::whatsapp_link(
        &populated.customer.contact,
        &message,
        &state.branding.whatsapp_country_code,
    );

    Ok(Json(WhatsAppLinkResponse {
        success: true,
        wa_link,
        message,
    }))
}

pub async fn booking_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<BookingStatusResponse>> {
    let stored = load_booking(&state, &id)?;
    Ok(Json(BookingStatusResponse {
        success: true,
        status: stored.status,
        updated_at: stored.updated_at,
    }))
}
