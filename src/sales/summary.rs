//! Daily sales summary from a manually entered snapshot.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::analysis::stats;
use crate::error::{Error, Result};

/// Sales of one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSale {
    /// Product name
    pub name: String,
    /// Units sold
    pub quantity: u64,
    /// Revenue
    pub amount: f64,
}

/// A day's totals as entered by hand (or exported as JSON).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesSnapshot {
    /// Day the snapshot covers, free text
    #[serde(default)]
    pub date: String,
    /// Revenue
    pub total_amount: f64,
    /// Number of orders
    #[serde(alias = "order_count")]
    pub orders: u64,
    /// Number of customers
    #[serde(alias = "customer_count")]
    pub customers: u64,
    /// Per-product sales
    #[serde(default)]
    pub products: Vec<ProductSale>,
    /// Revenue per payment method
    #[serde(default)]
    pub payment_methods: IndexMap<String, f64>,
    /// Revenue per time slot
    #[serde(default)]
    pub time_slots: IndexMap<String, f64>,
    /// Customers per customer type (new, returning, ...)
    #[serde(default)]
    pub customer_types: IndexMap<String, u64>,
}

impl SalesSnapshot {
    /// Load a snapshot from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        let snapshot: Self = serde_json::from_str(text)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Reject negative or non-finite amounts.
    pub fn validate(&self) -> Result<()> {
        let amounts = std::iter::once(self.total_amount)
            .chain(self.products.iter().map(|p| p.amount))
            .chain(self.payment_methods.values().copied())
            .chain(self.time_slots.values().copied());
        for amount in amounts {
            if !amount.is_finite() || amount < 0.0 {
                return Err(Error::validation(format!("invalid amount {amount}")));
            }
        }
        Ok(())
    }
}

/// A labelled value with its share of the total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Share {
    /// Label
    pub label: String,
    /// Value
    pub value: f64,
    /// Share of the total, percent rounded to cents
    pub percentage: f64,
}

fn shares<'a, I>(items: I) -> Vec<Share>
where
    I: IntoIterator<Item = (&'a String, f64)>,
{
    let items: Vec<(&String, f64)> = items.into_iter().collect();
    let total: f64 = items.iter().map(|(_, v)| v).sum();
    items
        .into_iter()
        .map(|(label, value)| Share {
            label: label.clone(),
            value,
            percentage: stats::round2(stats::percentage(value, total)),
        })
        .collect()
}

/// Day rating by revenue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceRating {
    /// 10000 and above
    Excellent,
    /// 5000 and above
    Good,
    /// 2000 and above
    Fair,
    /// Below 2000
    NeedsWork,
}

impl PerformanceRating {
    /// Rate a day's revenue.
    pub fn from_revenue(amount: f64) -> Self {
        if amount >= 10_000.0 {
            Self::Excellent
        } else if amount >= 5_000.0 {
            Self::Good
        } else if amount >= 2_000.0 {
            Self::Fair
        } else {
            Self::NeedsWork
        }
    }

    /// Label used in reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::NeedsWork => "needs work",
        }
    }

    /// What to do about it.
    pub fn suggestion(self) -> &'static str {
        match self {
            Self::Excellent => "strong day, consider widening the range",
            Self::Good => "solid day, keep the mix and tune it",
            Self::Fair => "room to grow, push promotions",
            Self::NeedsWork => "work on marketing and customer follow-up",
        }
    }
}

/// Cost and profit estimated from revenue with a flat cost ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EstimatedProfit {
    /// Estimated cost of goods
    pub cost: f64,
    /// Revenue minus cost
    pub profit: f64,
    /// Profit over revenue, percent; 0 without revenue
    pub margin: f64,
}

impl EstimatedProfit {
    /// Cost ratio assumed when purchase prices are unknown.
    pub const COST_RATIO: f64 = 0.5;

    /// Estimate from `revenue` with [`COST_RATIO`](Self::COST_RATIO).
    pub fn from_revenue(revenue: f64) -> Self {
        let cost = revenue * Self::COST_RATIO;
        let profit = revenue - cost;
        Self {
            cost: stats::round2(cost),
            profit: stats::round2(profit),
            margin: stats::round2(stats::percentage(profit, revenue)),
        }
    }
}

/// Derived figures for a [`SalesSnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesSummary {
    /// Day covered
    pub date: String,
    /// Revenue
    pub total_amount: f64,
    /// Orders
    pub orders: u64,
    /// Customers
    pub customers: u64,
    /// Revenue per order
    pub average_order_value: Option<f64>,
    /// Revenue per customer
    pub per_customer_spend: Option<f64>,
    /// Units over all products
    pub units_sold: u64,
    /// Products by revenue, highest first, with their revenue share
    pub product_ranking: Vec<Share>,
    /// Payment methods with their revenue share
    pub payment_shares: Vec<Share>,
    /// Time slots with their revenue share
    pub time_slot_shares: Vec<Share>,
    /// Customer types with their head-count share
    pub customer_type_shares: Vec<Share>,
    /// Rating of the day's revenue
    pub rating: PerformanceRating,
    /// Cost and profit at the flat cost ratio
    pub estimated_profit: EstimatedProfit,
}

impl SalesSummary {
    /// Summarize `snapshot`.
    pub fn from_snapshot(snapshot: &SalesSnapshot) -> Self {
        let mut products: Vec<&ProductSale> = snapshot.products.iter().collect();
        products.sort_by(|a, b| b.amount.total_cmp(&a.amount));

        Self {
            date: snapshot.date.clone(),
            total_amount: snapshot.total_amount,
            orders: snapshot.orders,
            customers: snapshot.customers,
            average_order_value: stats::average_order_value(snapshot.total_amount, snapshot.orders),
            per_customer_spend: stats::average_order_value(
                snapshot.total_amount,
                snapshot.customers,
            ),
            units_sold: snapshot.products.iter().map(|p| p.quantity).sum(),
            product_ranking: shares(products.iter().map(|p| (&p.name, p.amount))),
            payment_shares: shares(snapshot.payment_methods.iter().map(|(k, v)| (k, *v))),
            time_slot_shares: shares(snapshot.time_slots.iter().map(|(k, v)| (k, *v))),
            customer_type_shares: shares(
                snapshot.customer_types.iter().map(|(k, v)| (k, *v as f64)),
            ),
            rating: PerformanceRating::from_revenue(snapshot.total_amount),
            estimated_profit: EstimatedProfit::from_revenue(snapshot.total_amount),
        }
    }
}
