//! Catalog browsing filters and legacy catalog import.
//!
//! The gallery filters pieces by medium, size and availability. Older catalog
//! exports give prices either as numbers (`450`, `null`) or as display strings
//! (`"$450"`, `"N/A"`) and identify pieces by slug; [`LegacyArtwork`] converts
//! them into [`Item`]s.

use crate::types::{Currency, Item, ItemId};
use serde::Deserialize;
use std::str::FromStr;
use thiserror::Error;

/// Availability filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Availability {
    /// Only sold pieces
    Sold,
    /// Only pieces still for sale
    Available,
}

impl FromStr for Availability {
    type Err = UnknownAvailability;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sold" => Ok(Self::Sold),
            "available" | "unsold" => Ok(Self::Available),
            _ => Err(UnknownAvailability(s.to_string())),
        }
    }
}

/// Unrecognised availability filter value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown availability filter '{0}', expected 'sold' or 'available'")]
pub struct UnknownAvailability(pub String);

/// Gallery filter. Empty fields match everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CatalogFilter {
    /// Exact medium, case-insensitive
    pub medium: Option<String>,
    /// Exact dimensions, case-insensitive
    pub size: Option<String>,
    /// Sold or available
    pub availability: Option<Availability>,
}

impl CatalogFilter {
    /// Filter that matches every item
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Whether `item` passes this filter.
    #[must_use]
    pub fn matches(&self, item: &Item) -> bool {
        let field_matches = |wanted: &Option<String>, actual: &Option<String>| match wanted {
            None => true,
            Some(wanted) => actual
                .as_deref()
                .is_some_and(|actual| actual.eq_ignore_ascii_case(wanted.trim())),
        };

        let availability_matches = match self.availability {
            None => true,
            Some(Availability::Sold) => item.sold,
            Some(Availability::Available) => !item.sold,
        };

        field_matches(&self.medium, &item.medium)
            && field_matches(&self.size, &item.dimensions)
            && availability_matches
    }
}

/// Parse a display price into minor units.
///
/// Currency symbols, separators and whitespace are ignored and at most two
/// fraction digits are kept, so `"$450"` is `45000`, `"$450.50"` is `45050`
/// and `"$5,000"` is `500000`. Strings without digits (`"N/A"`), malformed
/// decimals and zero are not for sale.
///
/// # Examples
///
/// ```
/// use atelier_core::catalog::parse_display_price;
///
/// assert_eq!(parse_display_price("$450"), Some(45_000));
/// assert_eq!(parse_display_price("$450.50"), Some(45_050));
/// assert_eq!(parse_display_price("N/A"), None);
/// ```
#[must_use]
pub fn parse_display_price(display: &str) -> Option<i64> {
    let number: String = display
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let (whole, fraction) = number.split_once('.').unwrap_or((number.as_str(), ""));
    if (whole.is_empty() && fraction.is_empty()) || fraction.contains('.') {
        return None;
    }

    let whole = if whole.is_empty() { 0 } else { whole.parse::<i64>().ok()? };
    let cents = match fraction.as_bytes() {
        [] => 0,
        [tens] => i64::from(tens - b'0') * 10,
        [tens, ones, ..] => i64::from(tens - b'0') * 10 + i64::from(ones - b'0'),
    };

    whole
        .checked_mul(100)
        .and_then(|minor| minor.checked_add(cents))
        .filter(|minor| *minor > 0)
}

/// Price of a legacy record: a plain amount or a display string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LegacyPrice {
    /// Amount in major units, e.g. `450`
    Amount(f64),
    /// Display string, e.g. `"$450"` or `"N/A"`
    Display(String),
}

impl LegacyPrice {
    /// Price in minor units, `None` when not for sale.
    #[must_use]
    pub fn minor_units(&self) -> Option<i64> {
        match self {
            Self::Amount(amount) if amount.is_finite() && *amount > 0.0 => {
                parse_display_price(&format!("{amount:.2}"))
            }
            Self::Amount(_) => None,
            Self::Display(display) => parse_display_price(display),
        }
    }
}

/// Derive a stable id from a title: lower-case ASCII words joined by `-`.
///
/// # Examples
///
/// ```
/// use atelier_core::catalog::slugify;
///
/// assert_eq!(slugify("King Square At Night"), "king-square-at-night");
/// ```
#[must_use]
pub fn slugify(title: &str) -> String {
    title
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// One record of a legacy catalog export.
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyArtwork {
    /// Id, taken from `slug` or derived from the title when absent
    #[serde(default)]
    pub id: Option<String>,
    /// URL slug, e.g. `comfort-in-change`
    #[serde(default)]
    pub slug: Option<String>,
    /// Title
    pub title: String,
    /// Medium
    #[serde(default)]
    pub medium: Option<String>,
    /// Size, e.g. `18"x24"`
    #[serde(default)]
    pub size: Option<String>,
    /// Year
    #[serde(default)]
    pub date: Option<String>,
    /// Price as a number or display string, `null` when not for sale
    #[serde(default)]
    pub price: Option<LegacyPrice>,
    /// Display price used when `price` is absent or unusable
    #[serde(default, rename = "priceDisplay")]
    pub price_display: Option<String>,
    /// Whether it has been sold
    #[serde(default)]
    pub sold: bool,
    /// Image URLs
    #[serde(default)]
    pub imgs: Vec<String>,
    /// Single image URL used by the oldest exports
    #[serde(default)]
    pub img: Option<String>,
    /// Single image URL
    #[serde(default, rename = "imageUrl")]
    pub image_url: Option<String>,
    /// Currency code, CAD when absent
    #[serde(default)]
    pub currency: Option<String>,
}

impl LegacyArtwork {
    /// Convert into an [`Item`]. Pieces sold before the shop existed keep
    /// `sold = true` with no session attached.
    #[must_use]
    pub fn into_item(self) -> Item {
        let id = self
            .id
            .into_iter()
            .chain(self.slug)
            .map(|id| id.trim().to_string())
            .find(|id| !id.is_empty())
            .unwrap_or_else(|| slugify(&self.title));
        let price = self
            .price
            .as_ref()
            .and_then(LegacyPrice::minor_units)
            .or_else(|| self.price_display.as_deref().and_then(parse_display_price))
            .unwrap_or(0);
        let currency = self
            .currency
            .as_deref()
            .map_or_else(Currency::default, Currency::new);
        let not_applicable = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("n/a"))
                .map(str::to_string)
        };

        let mut image_urls = self.imgs;
        if image_urls.is_empty() {
            image_urls.extend(self.img.or(self.image_url));
        }

        let mut item = Item::new(ItemId::new(id), self.title, price, currency);
        item.medium = not_applicable(&self.medium);
        item.dimensions = not_applicable(&self.size);
        item.year = not_applicable(&self.date);
        item.image_urls = image_urls;
        item.sold = self.sold;
        item
    }
}
