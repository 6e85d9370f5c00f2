//! Defines the `Category` type and the keyword lookup that maps a merchant
//! name to a spending category.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// A spending category for classified transactions.
///
/// The set is closed: every transaction lands in exactly one of these, with
/// [Category::Other] as the catch-all for merchants no keyword matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Food delivery and dining out.
    Food,
    /// Utilities and recharges.
    Bills,
    /// Streaming and ticketing services.
    Entertainment,
    /// Online retail.
    Shopping,
    /// Rides, trains and travel booking.
    Travel,
    /// Anything that matched no keyword.
    Other,
}

impl Category {
    /// The category name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Food => "Food",
            Category::Bills => "Bills",
            Category::Entertainment => "Entertainment",
            Category::Shopping => "Shopping",
            Category::Travel => "Travel",
            Category::Other => "Other",
        }
    }

    /// Parse a category from its stored name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Food" => Some(Category::Food),
            "Bills" => Some(Category::Bills),
            "Entertainment" => Some(Category::Entertainment),
            "Shopping" => Some(Category::Shopping),
            "Travel" => Some(Category::Travel),
            "Other" => Some(Category::Other),
            _ => None,
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// The keyword table, evaluated top to bottom. The first category with a
/// keyword contained in the merchant name wins, so the order of the rows is
/// significant.
const CATEGORY_KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::Food,
        &["swiggy", "zomato", "dominos", "pizza", "restaurant"],
    ),
    (
        Category::Bills,
        &["electricity", "water", "gas", "bill", "recharge"],
    ),
    (
        Category::Entertainment,
        &["netflix", "primevideo", "bookmyshow", "spotify"],
    ),
    (
        Category::Shopping,
        &["amazon", "flipkart", "myntra", "ajio"],
    ),
    (
        Category::Travel,
        &["ola", "uber", "makemytrip", "irctc"],
    ),
];

/// Classify a merchant name into a spending category.
///
/// Keyword matching is a case-insensitive substring search. Merchants that
/// match no keyword are classified as [Category::Other], so every input
/// produces a category.
pub fn classify(merchant: &str) -> Category {
    let merchant = merchant.to_lowercase();

    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| merchant.contains(keyword)))
        .map(|(category, _)| *category)
        .unwrap_or(Category::Other)
}
