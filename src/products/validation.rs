use rust_decimal::Decimal;

use super::dto::ProductForm;
use crate::outcome::Outcome;

pub const MIN_NAME_LEN: usize = 3;

/// Runs every check and collects all failures; zero is an accepted price.
pub fn validate_product(form: &ProductForm) -> Outcome {
    let mut outcome = Outcome::success();
    if form.name.chars().count() < MIN_NAME_LEN {
        outcome.push_error(format!(
            "Product name must not be less than {MIN_NAME_LEN} characters."
        ));
    }
    if form.price < Decimal::ZERO {
        outcome.push_error("Product price must be greater than 0.");
    }
    outcome
}

pub fn reference_taken_message(reference: &str) -> String {
    format!("A product with reference [{reference}] already exists.")
}
