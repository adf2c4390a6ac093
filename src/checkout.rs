//! Checkout wizard
//!
//! Three steps: contact details, review, confirmation. The wizard owns the
//! booking form and its per-field errors and drives the submission state
//! machine:
//!
//! ```text
//! Collecting --begin_submit--> Submitting --finish_submit(Ok)--> Completed
//!     ^                             |
//!     +-----------------------------+ finish_submit(Err)
//! ```
//!
//! While a submission is in flight, further `begin_submit` calls return
//! `None`, which is what keeps a double click from creating two bookings.

use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::cart::{CartPersistence, CartStore};
use crate::client::ClientError;
use crate::model::{Category, PopulatedBooking};
use crate::notice::Notice;
use crate::validation::{self, normalize_phone, Attachment, BookingForm, Field, FieldErrors};

const FIX_ERRORS_MESSAGE: &str = "Please fix the errors before proceeding.";
const SUBMIT_FAILED_MESSAGE: &str = "Error confirming booking. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Contact,
    Review,
    Confirmation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitState {
    Collecting,
    Submitting,
    Completed(BookingReceipt),
}

/// Server acknowledgement of a booking
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingReceipt {
    pub booking: PopulatedBooking,
    pub whatsapp_message: String,
}

/// A complete submission, ready to be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRequest {
    pub full_name: String,
    pub email: String,
    pub contact: String,
    pub address: String,
    pub emergency_contact: String,
    /// One id per rented unit
    pub cameras: Vec<String>,
    /// One id per rented unit
    pub accessories: Vec<String>,
    /// `"YYYY-MM-DD to YYYY-MM-DD (N days)"`
    pub rental_period: String,
    /// Client-side estimate; the server computes its own
    pub estimated_total: u64,
    pub id_proof: Attachment,
    pub user_photo: Attachment,
}

impl BookingRequest {
    /// Encodes the request as the multipart body of `POST /api/bookings`
    pub fn into_multipart(self) -> Result<Form, ClientError> {
        let mut form = Form::new()
            .text(Field::FullName.as_str(), self.full_name)
            .text(Field::Email.as_str(), self.email)
            .text(Field::Contact.as_str(), self.contact)
            .text(Field::Address.as_str(), self.address)
            .text(Field::EmergencyContact.as_str(), self.emergency_contact)
            .text("rentalPeriod", self.rental_period)
            .text("totalAmount", self.estimated_total.to_string());

        for id in self.cameras {
            form = form.text("cameras", id);
        }
        for id in self.accessories {
            form = form.text("accessories", id);
        }

        Ok(form
            .part(Field::IdProof.as_str(), file_part(self.id_proof)?)
            .part(Field::UserPhoto.as_str(), file_part(self.user_photo)?))
    }
}

fn file_part(attachment: Attachment) -> Result<Part, ClientError> {
    let Attachment {
        file_name,
        content_type,
        bytes,
    } = attachment;
    Ok(Part::bytes(bytes).file_name(file_name).mime_str(&content_type)?)
}

#[derive(Debug, Clone)]
pub struct CheckoutWizard {
    form: BookingForm,
    errors: FieldErrors,
    step: Step,
    state: SubmitState,
}

impl Default for CheckoutWizard {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckoutWizard {
    pub fn new() -> Self {
        Self {
            form: BookingForm::default(),
            errors: FieldErrors::default(),
            step: Step::Contact,
            state: SubmitState::Collecting,
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn state(&self) -> &SubmitState {
        &self.state
    }

    pub fn form(&self) -> &BookingForm {
        &self.form
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn is_submitting(&self) -> bool {
        self.state == SubmitState::Submitting
    }

    /// Updates a text field and clears its error
    ///
    /// Phone fields are normalized as they are typed; attachment fields
    /// are set through [`attach`](Self::attach) instead.
    pub fn set_field(&mut self, field: Field, value: &str) {
        match field {
            Field::FullName => self.form.full_name = value.to_string(),
            Field::Email => self.form.email = value.to_string(),
            Field::Address => self.form.address = value.to_string(),
            Field::Contact | Field::EmergencyContact => return self.set_phone(field, value),
            Field::IdProof | Field::UserPhoto => return,
        }
        self.clear_error(field);
    }

    /// Stores the digits of `raw` (at most ten) in a phone field
    pub fn set_phone(&mut self, field: Field, raw: &str) {
        let digits = normalize_phone(raw);
        match field {
            Field::Contact => self.form.contact = digits,
            Field::EmergencyContact => self.form.emergency_contact = digits,
            _ => return,
        }
        self.clear_error(field);
    }

    /// Selects (or with `None`, unselects) a document
    pub fn attach(&mut self, field: Field, attachment: Option<Attachment>) {
        match field {
            Field::IdProof => self.form.id_proof = attachment,
            Field::UserPhoto => self.form.user_photo = attachment,
            _ => return,
        }
        self.clear_error(field);
    }

    pub fn clear_error(&mut self, field: Field) {
        self.errors.clear(field);
    }

    /// Advances from contact details to review
    ///
    /// Returns the notification to show when validation blocks the move.
    pub fn next(&mut self) -> Option<Notice> {
        if self.step != Step::Contact {
            return None;
        }
        self.errors = validation::validate(&self.form);
        if !self.errors.is_empty() {
            return Some(Notice::error(FIX_ERRORS_MESSAGE));
        }
        self.step = Step::Review;
        None
    }

    pub fn back(&mut self) {
        if self.step == Step::Review && !self.is_submitting() {
            self.step = Step::Contact;
        }
    }

    /// Starts a submission from the review step
    ///
    /// Returns `None` when not on the review step, when a submission is
    /// already running or finished, when the cart cannot check out, or
    /// when the form is invalid.
    pub fn begin_submit<P: CartPersistence>(&mut self, cart: &CartStore<P>) -> Option<BookingRequest> {
        if self.step != Step::Review
            || self.state != SubmitState::Collecting
            || !cart.can_checkout()
        {
            return None;
        }

        self.errors = validation::validate(&self.form);
        if !self.errors.is_empty() {
            return None;
        }
        let rental_period = cart.dates().format_period()?;
        let id_proof = self.form.id_proof.clone()?;
        let user_photo = self.form.user_photo.clone()?;

        self.state = SubmitState::Submitting;
        Some(BookingRequest {
            full_name: self.form.full_name.trim().to_string(),
            email: self.form.email.trim().to_string(),
            contact: self.form.contact.clone(),
            address: self.form.address.trim().to_string(),
            emergency_contact: self.form.emergency_contact.clone(),
            cameras: cart.unit_ids(Category::Camera),
            accessories: cart.unit_ids(Category::Accessory),
            rental_period,
            estimated_total: cart.estimated_total(),
            id_proof,
            user_photo,
        })
    }

    /// Records the outcome of the submission started by `begin_submit`
    ///
    /// On success the cart is emptied and the wizard moves to the
    /// confirmation step. A failure goes back to collecting on the review
    /// step so the same form can be sent again. Returns `None` if no
    /// submission was running.
    pub fn finish_submit<P: CartPersistence>(
        &mut self,
        result: Result<BookingReceipt, ClientError>,
        cart: &mut CartStore<P>,
    ) -> Option<Notice> {
        if !self.is_submitting() {
            return None;
        }

        match result {
            Ok(receipt) => {
                tracing::info!(booking_id = %receipt.booking.id, "Booking confirmed");
                cart.clear();
                self.state = SubmitState::Completed(receipt);
                self.step = Step::Confirmation;
                Some(Notice::success("Booking confirmed! Thank you!"))
            }
            Err(err) => {
                tracing::warn!(error = %err, "Booking submission failed");
                let message = match err {
                    ClientError::Api { message, .. } if !message.trim().is_empty() => message,
                    _ => SUBMIT_FAILED_MESSAGE.to_string(),
                };
                self.state = SubmitState::Collecting;
                Some(Notice::error(message))
            }
        }
    }
}
