use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Success,
    Error,
}

/// User-facing result of a validation or authorization step.
///
/// Messages accumulate in the order the checks ran; any message pushed
/// through [`Outcome::push_error`] flips the category to `Error`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Outcome {
    pub category: Category,
    pub messages: Vec<String>,
}

impl Outcome {
    pub fn success() -> Self {
        Self {
            category: Category::Success,
            messages: Vec::new(),
        }
    }

    pub fn success_with(message: impl Into<String>) -> Self {
        Self {
            category: Category::Success,
            messages: vec![message.into()],
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            category: Category::Error,
            messages: vec![message.into()],
        }
    }

    pub fn push_error(&mut self, message: impl Into<String>) {
        self.category = Category::Error;
        self.messages.push(message.into());
    }

    pub fn is_success(&self) -> bool {
        self.category == Category::Success
    }
}

/// Identity of a freshly inserted row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Created {
    pub id: i64,
}

impl Default for Outcome {
    fn default() -> Self {
        Self::success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_error_switches_category_and_keeps_order() {
        let mut outcome = Outcome::success();
        outcome.push_error("first");
        outcome.push_error("second");
        assert_eq!(outcome.category, Category::Error);
        assert_eq!(outcome.messages, vec!["first", "second"]);
    }

    #[test]
    fn serializes_lowercase_category() {
        let json = serde_json::to_value(Outcome::error("nope")).unwrap();
        assert_eq!(json["category"], "error");
        assert_eq!(json["messages"][0], "nope");
    }
}
