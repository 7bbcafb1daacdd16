use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ProductForm {
    pub name: String,
    pub price: Decimal,
    pub reference: String,
}

#[derive(Debug, Deserialize)]
pub struct ReferenceCheck {
    pub reference: String,
}
