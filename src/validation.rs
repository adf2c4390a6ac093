//! Booking form validation
//!
//! A stateless rule table applied to the checkout form on the client and
//! re-applied to the multipart payload on the server. The result is a
//! field → message map; an empty map means the form is valid.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};
use validator::ValidateEmail;

/// Number of digits in a valid phone number
pub const PHONE_DIGITS: usize = 10;

/// A file picked for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    /// File extension taken from the name, falling back to the MIME subtype
    pub fn extension(&self) -> String {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .or_else(|| self.content_type.split_once('/').map(|(_, sub)| sub))
            .unwrap_or("bin")
            .to_ascii_lowercase()
    }
}

/// The customer-supplied part of a booking
///
/// Attachments are explicit options: `None` means no file was selected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingForm {
    pub full_name: String,
    pub email: String,
    pub contact: String,
    pub address: String,
    pub emergency_contact: String,
    pub id_proof: Option<Attachment>,
    pub user_photo: Option<Attachment>,
}

/// A validated form field
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    FullName,
    Email,
    Contact,
    Address,
    EmergencyContact,
    IdProof,
    UserPhoto,
}

impl Field {
    /// Wire name of the field, as used in the multipart payload
    pub fn as_str(self) -> &'static str {
        match self {
            Field::FullName => "fullName",
            Field::Email => "email",
            Field::Contact => "contact",
            Field::Address => "address",
            Field::EmergencyContact => "emergencyContact",
            Field::IdProof => "idProof",
            Field::UserPhoto => "userPhoto",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Per-field error messages, ordered by field
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<Field, &'static str>);

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: Field) -> Option<&'static str> {
        self.0.get(&field).copied()
    }

    /// Drops the message for a field, e.g. once the user edits it
    pub fn clear(&mut self, field: Field) {
        self.0.remove(&field);
    }

    fn record(&mut self, field: Field, message: Option<&'static str>) {
        if let Some(message) = message {
            self.0.insert(field, message);
        }
    }

    /// Messages in field order, for error envelopes
    pub fn messages(&self) -> Vec<String> {
        self.0.values().map(|message| message.to_string()).collect()
    }
}

/// Applies every rule to the form
pub fn validate(form: &BookingForm) -> FieldErrors {
    let mut errors = FieldErrors::default();

    errors.record(Field::FullName, check_required(&form.full_name, "Full name is required"));
    errors.record(Field::Email, check_email(&form.email));
    errors.record(
        Field::Contact,
        check_phone(&form.contact, "Contact number is required"),
    );
    errors.record(Field::Address, check_required(&form.address, "Address is required"));
    errors.record(
        Field::EmergencyContact,
        check_phone(&form.emergency_contact, "Emergency contact is required"),
    );
    if form.id_proof.is_none() {
        errors.record(Field::IdProof, Some("ID Proof is required"));
    }
    if form.user_photo.is_none() {
        errors.record(Field::UserPhoto, Some("User photo is required"));
    }

    errors
}

/// Non-empty after trimming
pub fn check_required(value: &str, message: &'static str) -> Option<&'static str> {
    value.trim().is_empty().then_some(message)
}

/// Non-empty and shaped like `local@domain.tld`
pub fn check_email(value: &str) -> Option<&'static str> {
    let value = value.trim();
    if value.is_empty() {
        return Some("Email is required");
    }
    let has_tld = value
        .rsplit_once('@')
        .and_then(|(_, domain)| domain.rsplit_once('.'))
        .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty());
    if !has_tld || !value.validate_email() {
        return Some("Please enter a valid email address");
    }
    None
}

/// Non-empty and exactly ten digits once non-digits are stripped
pub fn check_phone(value: &str, required_message: &'static str) -> Option<&'static str> {
    if value.trim().is_empty() {
        return Some(required_message);
    }
    let digits = value.chars().filter(char::is_ascii_digit).count();
    (digits != PHONE_DIGITS).then_some("Please enter a valid 10-digit phone number")
}

/// Keystroke normalization for phone inputs
///
/// Strips everything but ASCII digits and truncates to ten digits.
pub fn normalize_phone(input: &str) -> String {
    input
        .chars()
        .filter(char::is_ascii_digit)
        .take(PHONE_DIGITS)
        .collect()
}
