use bigdecimal::BigDecimal;
use uuid::Uuid;

/// Catalog record as seen by the order engine. The catalog owns it; orders
/// only read the price fields and move `stock` through conditional updates.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    /// Percentage in `0..=100`.
    pub discount: BigDecimal,
    pub stock: i32,
    pub images: Vec<String>,
    pub is_active: bool,
}

impl Product {
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    pub fn summary(&self) -> ProductSummary {
        ProductSummary {
            id: self.id,
            name: self.name.clone(),
            image: self.primary_image().map(str::to_string),
            price: self.price.clone(),
        }
    }
}

/// Display fields joined onto order lines for responses.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub price: BigDecimal,
}
