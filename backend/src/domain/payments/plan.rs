//! Fixed price table mapping plan identifiers to amount, currency and credits.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A purchasable credit pack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePlan {
    /// Stable identifier supplied by clients (e.g. `solo-global`).
    pub id: String,
    /// Price in minor currency units.
    pub amount: u64,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Credits granted once the payment settles.
    pub credits: u32,
}

impl PricePlan {
    /// Build a plan entry.
    pub fn new(id: impl Into<String>, amount: u64, currency: impl Into<String>, credits: u32) -> Self {
        Self {
            id: id.into(),
            amount,
            currency: currency.into(),
            credits,
        }
    }
}

/// Enumerated price list injected into the payment order service.
///
/// # Examples
/// ```
/// use voicepost_backend::domain::PricePlanTable;
///
/// let table = PricePlanTable::default();
/// let plan = table.get("solo-global").expect("default plan");
/// assert_eq!((plan.amount, plan.currency.as_str(), plan.credits), (999, "INR", 30));
/// assert!(table.get("enterprise").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricePlanTable {
    plans: BTreeMap<String, PricePlan>,
}

impl PricePlanTable {
    /// Build a table from plan entries. Later entries replace earlier ones
    /// with the same identifier.
    pub fn new(plans: impl IntoIterator<Item = PricePlan>) -> Self {
        Self {
            plans: plans
                .into_iter()
                .map(|plan| (plan.id.clone(), plan))
                .collect(),
        }
    }

    /// Look up a plan by identifier.
    pub fn get(&self, plan_id: &str) -> Option<&PricePlan> {
        self.plans.get(plan_id)
    }

    /// Known plan identifiers in sorted order.
    pub fn plan_ids(&self) -> impl Iterator<Item = &str> {
        self.plans.keys().map(String::as_str)
    }
}

impl Default for PricePlanTable {
    fn default() -> Self {
        Self::new([
            PricePlan::new("solo-starter", 499, "INR", 10),
            PricePlan::new("solo-global", 999, "INR", 30),
            PricePlan::new("team-global", 2499, "INR", 100),
        ])
    }
}
