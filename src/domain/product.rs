use serde::{Deserialize, Serialize};

/// Maximum number of redirect links kept per product.
pub const MAX_LINKS: usize = 3;

/// Represents a product in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    /// Whole currency units; the shop does not deal in fractions.
    pub price: u64,
    pub stock: u32,
    pub description: String,
    pub links: Vec<String>,
}

/// Payload for creating a new product. The id is supplied separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
    pub name: String,
    pub price: u64,
    pub stock: u32,
    pub description: String,
    pub links: Vec<String>,
}

/// Payload for a partial product update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub price: Option<u64>,
    pub stock: Option<u32>,
    pub description: Option<String>,
    pub links: Option<Vec<String>>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.price.is_none()
            && self.stock.is_none()
            && self.description.is_none()
            && self.links.is_none()
    }
}

/// Copy of the product fields an order keeps, taken when ordering starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: String,
    pub name: String,
    pub price: u64,
}

impl Product {
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: u64, stock: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            stock,
            description: String::new(),
            links: Vec::new(),
        }
    }

    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            price: self.price,
        }
    }
}

impl ProductDraft {
    pub fn new(name: impl Into<String>, price: u64, stock: u32) -> Self {
        Self {
            name: name.into(),
            price,
            stock,
            description: String::new(),
            links: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_links(mut self, links: Vec<String>) -> Self {
        self.links = links;
        self
    }
}

/// Formats an amount the way the shop displays prices, e.g. `Rp50.000`.
pub fn format_price(amount: u64) -> String {
    let digits = amount.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    format!("Rp{grouped}")
}
