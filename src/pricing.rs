//! Rental price calculation
//!
//! The same pure functions back the cart display and the authoritative
//! server-side charge. On the server the lines must come from freshly
//! populated catalog records ([`lines_from_items`]), never from rates
//! echoed back by a client.

use serde::Serialize;

use crate::model::CatalogItem;

/// A daily rate and how many units are rented at that rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceLine {
    pub rate: u64,
    pub quantity: u32,
}

/// Result of a price calculation
#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Sum of rate × quantity over all lines
    pub per_day_subtotal: u64,

    /// `per_day_subtotal × day_count`; 0 while no valid period is chosen
    pub total: u64,
}

/// Prices a set of lines over `day_count` rental days
///
/// A non-positive day count yields a zero total but still reports the
/// per-day subtotal.
pub fn quote(lines: &[PriceLine], day_count: i64) -> Quote {
    let per_day_subtotal = lines.iter().fold(0u64, |sum, line| {
        sum.saturating_add(line.rate.saturating_mul(u64::from(line.quantity)))
    });
    let days = u64::try_from(day_count).unwrap_or(0);

    Quote {
        per_day_subtotal,
        total: per_day_subtotal.saturating_mul(days),
    }
}

/// Groups populated catalog items into price lines
///
/// Repeated items (one entry per rented unit) collapse into a single line
/// whose quantity is the number of repetitions. First-seen order is kept.
pub fn lines_from_items<'a, I>(items: I) -> Vec<PriceLine>
where
    I: IntoIterator<Item = &'a CatalogItem>,
{
    let mut grouped: Vec<(&str, PriceLine)> = Vec::new();
    for item in items {
        match grouped.iter_mut().find(|(id, _)| *id == item.id) {
            Some((_, line)) => line.quantity += 1,
            None => grouped.push((
                item.id.as_str(),
                PriceLine {
                    rate: item.effective_rate(),
                    quantity: 1,
                },
            )),
        }
    }
    grouped.into_iter().map(|(_, line)| line).collect()
}
