//! Booking notification templates
//!
//! Pure projections of a populated booking into the three outbound
//! artifacts: the admin "new booking" email, the customer confirmation
//! email and the WhatsApp message (plus its `wa.me` deep link). Nothing
//! here performs I/O; delivery lives in [`crate::dispatch`].

use std::fmt::Write as _;

use chrono::{Datelike, Utc};

use crate::config::Config;
use crate::model::{CatalogItem, PopulatedBooking};
use crate::validation::{normalize_phone, Attachment};

/// Content id of the inline ID proof image in the admin email
pub const ID_PROOF_CID: &str = "idProofImage";

/// Content id of the inline customer photo in the admin email
pub const USER_PHOTO_CID: &str = "userPhotoImage";

const LOGO_URL: &str =
    "https://res.cloudinary.com/dhqhk1k3t/image/upload/v1760359478/logo_dark_d7ik7y.png";

/// Brand details shared by every template
#[derive(Debug, Clone)]
pub struct Branding {
    pub name: String,
    pub sender: String,
    pub admin_email: Option<String>,
    pub business_phone: String,
    pub whatsapp_country_code: String,
}

impl Branding {
    pub fn from_config(config: &Config) -> Self {
        Self {
            name: config.brand_name.clone(),
            sender: config.email_sender.clone(),
            admin_email: config.admin_email.clone(),
            business_phone: config.business_phone.clone(),
            whatsapp_country_code: config.whatsapp_country_code.clone(),
        }
    }
}

/// A file carried inline with an email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAttachment {
    pub file_name: String,
    pub content_type: String,
    pub content_id: String,
    pub bytes: Vec<u8>,
}

/// A fully rendered email ready for a [`crate::dispatch::Mailer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub from_name: String,
    pub from_address: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub attachments: Vec<EmailAttachment>,
}

/// The documents uploaded with a booking, when their bytes are at hand
#[derive(Debug, Clone, Copy, Default)]
pub struct BookingDocuments<'a> {
    pub id_proof: Option<&'a Attachment>,
    pub user_photo: Option<&'a Attachment>,
}

/// Formats whole rupees with Indian digit grouping, e.g. `1,25,000`
pub fn format_inr(amount: u64) -> String {
    let digits = amount.to_string();
    if digits.len() <= 3 {
        return digits;
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut rest = head;
    while rest.len() > 2 {
        let (front, pair) = rest.split_at(rest.len() - 2);
        groups.push(pair);
        rest = front;
    }
    groups.push(rest);
    groups.reverse();

    format!("{},{}", groups.join(","), tail)
}

/// Escapes text for interpolation into HTML
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Collapses one-entry-per-unit item lists into (item, quantity) pairs
fn group_units(items: &[CatalogItem]) -> Vec<(&CatalogItem, u64)> {
    let mut grouped: Vec<(&CatalogItem, u64)> = Vec::new();
    for item in items {
        match grouped.iter_mut().find(|(seen, _)| seen.id == item.id) {
            Some((_, quantity)) => *quantity += 1,
            None => grouped.push((item, 1)),
        }
    }
    grouped
}

/// Plain-text booking confirmation for WhatsApp
pub fn whatsapp_message(booking: &PopulatedBooking, brand: &Branding) -> String {
    let mut message = format!(
        "Hello {}, your booking is confirmed!\n\n",
        booking.customer.full_name
    );
    let _ = writeln!(message, "📅 Rental Period: {}\n", booking.rental_period);

    for (heading, items) in [
        ("📷 Cameras:", &booking.cameras),
        ("🔧 Accessories:", &booking.accessories),
    ] {
        if items.is_empty() {
            continue;
        }
        let _ = writeln!(message, "{}", heading);
        for (item, quantity) in group_units(items) {
            let _ = writeln!(
                message,
                "• {} × {} - ₹{}/day",
                item.name,
                quantity,
                format_inr(item.effective_rate())
            );
        }
        message.push('\n');
    }

    let _ = writeln!(
        message,
        "💰 Total Amount: ₹{}\n",
        format_inr(booking.total_amount)
    );
    let _ = write!(
        message,
        "We'll contact you shortly to confirm pickup details. Thank you for choosing {}!",
        brand.name
    );
    message
}

/// `wa.me` deep link opening a chat with `contact` prefilled with `message`
pub fn whatsapp_link(contact: &str, message: &str, country_code: &str) -> String {
    let base = format!("https://wa.me/{}{}", country_code, normalize_phone(contact));
    reqwest::Url::parse_with_params(&base, &[("text", message)])
        .map(|url| url.to_string())
        .unwrap_or(base)
}

fn item_table(title: &str, items: &[CatalogItem]) -> String {
    let mut html = format!("<p>{} ({})</p>", title, items.len());
    if items.is_empty() {
        let _ = write!(html, "<p>No {} booked</p>", title.to_lowercase());
        return html;
    }

    html.push_str(
        "<table class=\"item-list\"><thead><tr><th>Name</th><th>Rate</th><th>Qty</th><th>Total</th></tr></thead><tbody>",
    );
    for (item, quantity) in group_units(items) {
        let rate = item.effective_rate();
        let _ = write!(
            html,
            "<tr><td>{}</td><td>₹{}</td><td>{}</td><td>₹{}</td></tr>",
            escape_html(&item.name),
            format_inr(rate),
            quantity,
            format_inr(rate.saturating_mul(quantity))
        );
    }
    html.push_str("</tbody></table>");
    html
}

fn document_row(label: &str, attachment: Option<&Attachment>, cid: &str, url: &str) -> String {
    let body = match attachment {
        Some(file) => format!(
            "<p>{}</p><img src=\"cid:{}\" class=\"document-image\" />",
            escape_html(&file.file_name),
            cid
        ),
        None if !url.is_empty() => format!("<a href=\"{0}\">{0}</a>", escape_html(url)),
        None => "Not uploaded".to_string(),
    };
    format!(
        "<div class=\"detail-row\"><div class=\"detail-label\">{}:</div><div class=\"detail-value\">{}</div></div>",
        label, body
    )
}

fn detail_row(label: &str, value: &str) -> String {
    format!(
        "<div class=\"detail-row\"><div class=\"detail-label\">{}:</div><div class=\"detail-value\">{}</div></div>",
        label, value
    )
}

/// Email to the business owner announcing a new booking
///
/// Returns `None` when no admin recipient is configured.
pub fn admin_email(
    booking: &PopulatedBooking,
    documents: BookingDocuments<'_>,
    brand: &Branding,
) -> Option<Email> {
    let to = brand.admin_email.clone()?;
    let customer = &booking.customer;
    let wa_link = whatsapp_link(
        &customer.contact,
        &whatsapp_message(booking, brand),
        &brand.whatsapp_country_code,
    );

    let mut html = String::from(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"UTF-8\"></head><body><div class=\"container\">",
    );
    let _ = write!(
        html,
        "<div class=\"header\"><img src=\"{}\" alt=\"Logo\"></div><div class=\"content\">",
        LOGO_URL
    );

    html.push_str("<div class=\"section\"><div class=\"section-title\">Customer Information</div>");
    html.push_str(&detail_row("Full Name", &escape_html(&customer.full_name)));
    html.push_str(&detail_row(
        "Email",
        &format!("<a href=\"mailto:{0}\">{0}</a>", escape_html(&customer.email)),
    ));
    html.push_str(&detail_row(
        "Contact",
        &format!("<a href=\"tel:{0}\">{0}</a>", escape_html(&customer.contact)),
    ));
    html.push_str(&detail_row(
        "Emergency Contact",
        &escape_html(&customer.emergency_contact),
    ));
    html.push_str(&detail_row("Address", &escape_html(&customer.address)));
    html.push_str("</div>");

    html.push_str("<div class=\"section\"><div class=\"section-title\">Documentation</div>");
    html.push_str(&document_row(
        "ID Proof",
        documents.id_proof,
        ID_PROOF_CID,
        &booking.id_proof_url,
    ));
    html.push_str(&document_row(
        "User Photo",
        documents.user_photo,
        USER_PHOTO_CID,
        &booking.user_photo_url,
    ));
    html.push_str("</div>");

    html.push_str("<div class=\"section\"><div class=\"section-title\">Rental Details</div>");
    html.push_str(&detail_row("Rental Period", &escape_html(&booking.rental_period)));
    html.push_str(&detail_row(
        "Booking Date",
        &booking.created_at.format("%Y-%m-%d %H:%M UTC").to_string(),
    ));
    html.push_str(&detail_row("Booking ID", &booking.id));
    html.push_str("</div>");

    html.push_str("<div class=\"section\"><div class=\"section-title\">Equipment Details</div>");
    html.push_str(&item_table("Cameras", &booking.cameras));
    html.push_str(&item_table("Accessories", &booking.accessories));
    html.push_str("</div>");

    let _ = write!(
        html,
        "<div class=\"total-section\">Final Total: ₹{}<br/>Rental Period: {}</div>",
        format_inr(booking.total_amount),
        escape_html(&booking.rental_period)
    );
    let _ = write!(
        html,
        "<div class=\"action-buttons\"><a href=\"{}\" class=\"whatsapp-btn\">Send WhatsApp</a><a href=\"mailto:{}\" class=\"email-btn\">Send Email</a></div>",
        escape_html(&wa_link),
        escape_html(&customer.email)
    );
    let _ = write!(
        html,
        "</div><div class=\"footer\">© {} {}. All rights reserved.</div></div></body></html>",
        Utc::now().year(),
        escape_html(&brand.name)
    );

    let attachments = [
        (documents.id_proof, ID_PROOF_CID),
        (documents.user_photo, USER_PHOTO_CID),
    ]
    .into_iter()
    .filter_map(|(file, cid)| {
        file.map(|file| EmailAttachment {
            file_name: file.file_name.clone(),
            content_type: file.content_type.clone(),
            content_id: cid.to_string(),
            bytes: file.bytes.clone(),
        })
    })
    .collect();

    Some(Email {
        from_name: brand.name.clone(),
        from_address: brand.sender.clone(),
        to,
        subject: format!("New Booking - {}", customer.full_name),
        html,
        attachments,
    })
}

/// Confirmation email to the customer
pub fn customer_email(booking: &PopulatedBooking, brand: &Branding) -> Email {
    let customer = &booking.customer;
    let business_digits: String = brand
        .business_phone
        .chars()
        .filter(char::is_ascii_digit)
        .collect();

    let mut html = String::from(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"UTF-8\"><title>Booking Confirmation</title></head><body><div class=\"container\">",
    );
    let _ = write!(
        html,
        "<div class=\"header\"><img src=\"{}\" alt=\"Logo\"><h2>Booking Confirmed</h2></div><div class=\"content\">",
        LOGO_URL
    );
    let _ = write!(
        html,
        "<div class=\"greeting\">Hello <strong>{}</strong>,</div><p class=\"intro\">Your booking has been successfully confirmed. Here are the details:</p>",
        escape_html(&customer.full_name)
    );
    html.push_str("<div class=\"section-title\">Order Details</div>");
    let _ = write!(
        html,
        "<div class=\"card\"><div class=\"item-label\">Rental Period</div><div class=\"item-value\">{}</div></div>",
        escape_html(&booking.rental_period)
    );
    let _ = write!(
        html,
        "<div class=\"card\"><div class=\"item-label\">Cameras</div><div class=\"item-value\">{} items</div></div>",
        booking.cameras.len()
    );
    let _ = write!(
        html,
        "<div class=\"card\"><div class=\"item-label\">Accessories</div><div class=\"item-value\">{} items</div></div>",
        booking.accessories.len()
    );
    let _ = write!(
        html,
        "<p class=\"total\">Total Amount: <strong>₹{}</strong></p>",
        format_inr(booking.total_amount)
    );
    let _ = write!(
        html,
        "<p class=\"note\">We will contact you shortly to finalize pickup or delivery. Questions? Call <a href=\"tel:+{0}\">{1}</a> or <a href=\"https://wa.me/{0}\">message us on WhatsApp</a>. Thank you for choosing <strong>{2}</strong>.</p>",
        business_digits,
        escape_html(&brand.business_phone),
        escape_html(&brand.name)
    );
    let _ = write!(
        html,
        "</div><div class=\"footer\">© {} {}. All rights reserved.</div></div></body></html>",
        Utc::now().year(),
        escape_html(&brand.name)
    );

    Email {
        from_name: brand.name.clone(),
        from_address: brand.sender.clone(),
        to: customer.email.clone(),
        subject: format!("Booking Confirmation - {}", brand.name),
        html,
        attachments: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BookingStatus, CatalogItemInput, Category, CustomerDetails};

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

    fn brand() -> Branding {
        Branding {
            name: "Rent My Cam".to_string(),
            sender: "no-reply@rentmycam.com".to_string(),
            admin_email: Some("owner@rentmycam.com".to_string()),
            business_phone: "+91 98765 43210".to_string(),
            whatsapp_country_code: "91".to_string(),
        }
    }

    fn booking() -> PopulatedBooking {
        let tripod = item("tripod", "Tripod", Category::Accessory, 300, Some(250));
        PopulatedBooking {
            id: "b-1".to_string(),
            customer: CustomerDetails {
                full_name: "Asha <Rao>".to_string(),
                email: "asha@example.com".to_string(),
                contact: "9876543210".to_string(),
                address: "12 MG Road".to_string(),
                emergency_contact: "9123456780".to_string(),
            },
            id_proof_url: "http://localhost/uploads/id.png".to_string(),
            user_photo_url: "http://localhost/uploads/photo.png".to_string(),
            cameras: vec![item("fx3", "Sony FX3", Category::Camera, 2000, None)],
            accessories: vec![tripod.clone(), tripod],
            rental_period: "2025-01-10 to 2025-01-13 (3 days)".to_string(),
            total_amount: 7500,
            status: BookingStatus::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_format_inr_grouping() {
        assert_eq!(format_inr(0), "0");
        assert_eq!(format_inr(999), "999");
        assert_eq!(format_inr(7500), "7,500");
        assert_eq!(format_inr(125000), "1,25,000");
        assert_eq!(format_inr(12345678), "1,23,45,678");
    }

    #[test]
    fn test_whatsapp_message_contents() {
        let message = whatsapp_message(&booking(), &brand());

        assert!(message.starts_with("Hello Asha <Rao>, your booking is confirmed!"));
        assert!(message.contains("📅 Rental Period: 2025-01-10 to 2025-01-13 (3 days)"));
        assert!(message.contains("• Sony FX3 × 1 - ₹2,000/day"));
        assert!(message.contains("• Tripod × 2 - ₹250/day"));
        assert!(message.contains("💰 Total Amount: ₹7,500"));
        assert!(message.ends_with("Thank you for choosing Rent My Cam!"));
    }

    #[test]
    fn test_whatsapp_message_skips_empty_sections() {
        let mut booking = booking();
        booking.accessories.clear();
        assert!(!whatsapp_message(&booking, &brand()).contains("Accessories"));
    }

    #[test]
    fn test_whatsapp_link_encodes_message() {
        let link = whatsapp_link("98765-43210", "Hi there & bye", "91");
        assert!(link.starts_with("https://wa.me/919876543210?text="));
        assert!(!link.contains(' '));
        assert!(link.contains("%26"));
    }

    #[test]
    fn test_admin_email_escapes_and_inlines_documents() {
        let photo = Attachment {
            file_name: "me.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            bytes: vec![1, 2],
        };
        let documents = BookingDocuments {
            id_proof: None,
            user_photo: Some(&photo),
        };
        let email = admin_email(&booking(), documents, &brand()).unwrap();

        assert_eq!(email.to, "owner@rentmycam.com");
        assert_eq!(email.subject, "New Booking - Asha <Rao>");
        assert!(email.html.contains("Asha &lt;Rao&gt;"));
        assert!(!email.html.contains("<Rao>"));
        assert!(email.html.contains("cid:userPhotoImage"));
        assert!(email.html.contains("http://localhost/uploads/id.png"));
        assert!(email.html.contains("<td>Tripod</td><td>₹250</td><td>2</td><td>₹500</td>"));
        assert!(email.html.contains("Final Total: ₹7,500"));
        assert_eq!(email.attachments.len(), 1);
        assert_eq!(email.attachments[0].content_id, USER_PHOTO_CID);
    }

    #[test]
    fn test_admin_email_needs_recipient() {
        let mut brand = brand();
        brand.admin_email = None;
        assert!(admin_email(&booking(), BookingDocuments::default(), &brand).is_none());
    }

    #[test]
    fn test_customer_email() {
        let email = customer_email(&booking(), &brand());

        assert_eq!(email.to, "asha@example.com");
        assert_eq!(email.subject, "Booking Confirmation - Rent My Cam");
        assert!(email.html.contains("₹7,500"));
        assert!(email.html.contains("2 items"));
        assert!(email.html.contains("https://wa.me/919876543210"));
        assert!(email.attachments.is_empty());
    }
}
