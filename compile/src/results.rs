//! The outcome of a compile: one [Notifications] record per category. A category is a
//! generator, the frontend (`hvir`), an extern kind, or the driver itself ([CORE]).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Category used for errors and warnings raised by the driver itself.
pub const CORE: &str = "hvcc";

/// Category holding the frontend's results.
pub const HVIR: &str = "hvir";

/// Errors, warnings, and category-specific output of one category.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Notifications {
    #[serde(default)]
    pub errors: Vec<String>,

    #[serde(default)]
    pub warnings: Vec<String>,

    /// Generator-specific output, e.g. the list of files written.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Notifications {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Results of a single `compile_dataflow` invocation, keyed by category name.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Results {
    categories: BTreeMap<String, Notifications>,
}

impl Results {
    /// Appends an error to `category`, creating the category if necessary.
    pub fn add_error(&mut self, category: &str, message: impl Into<String>) {
        self.entry(category).errors.push(message.into());
    }

    /// Appends a warning to `category`, creating the category if necessary.
    pub fn add_warning(&mut self, category: &str, message: impl Into<String>) {
        self.entry(category).warnings.push(message.into());
    }

    /// Stores `notifications` as the record for `category`, replacing any previous record.
    pub fn insert(&mut self, category: impl Into<String>, notifications: Notifications) {
        self.categories.insert(category.into(), notifications);
    }

    pub fn get(&self, category: &str) -> Option<&Notifications> {
        self.categories.get(category)
    }

    /// Iterates over the categories in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Notifications)> {
        self.categories.iter().map(|(name, n)| (name.as_str(), n))
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Returns `true` if any category recorded an error.
    pub fn has_errors(&self) -> bool {
        self.categories.values().any(Notifications::has_errors)
    }

    fn entry(&mut self, category: &str) -> &mut Notifications {
        self.categories.entry(category.into()).or_default()
    }
}
