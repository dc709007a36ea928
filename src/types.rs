use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use tabled::Tabled;

use crate::util::format_number;

/// Columns the loader insists on. Anything else in the file is ignored.
pub const REQUIRED_COLUMNS: [&str; 9] = [
    "order_id",
    "customer_unique_id",
    "order_purchase_timestamp",
    "order_approved_at",
    "order_status",
    "payment_value",
    "product_category_name_english",
    "customer_city",
    "customer_state",
];

#[derive(Debug, Clone, Deserialize)]
pub struct RawRow {
    pub order_id: Option<String>,
    pub customer_unique_id: Option<String>,
    pub order_purchase_timestamp: Option<String>,
    pub order_approved_at: Option<String>,
    pub order_status: Option<String>,
    pub payment_value: Option<String>,
    pub product_category_name_english: Option<String>,
    pub customer_city: Option<String>,
    pub customer_state: Option<String>,
}

/// Time-of-day bucket for the purchase hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum OrderPeriod {
    Night,
    Morning,
    Afternoon,
    Evening,
}

impl OrderPeriod {
    /// All buckets in hour order.
    pub const ALL: [OrderPeriod; 4] = [
        OrderPeriod::Night,
        OrderPeriod::Morning,
        OrderPeriod::Afternoon,
        OrderPeriod::Evening,
    ];

    /// Right-open buckets [0,6), [6,12), [12,18), [18,24). Anything else is
    /// unclassified.
    pub fn from_hour(hour: u32) -> Option<Self> {
        match hour {
            0..=5 => Some(OrderPeriod::Night),
            6..=11 => Some(OrderPeriod::Morning),
            12..=17 => Some(OrderPeriod::Afternoon),
            18..=23 => Some(OrderPeriod::Evening),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderPeriod::Night => "Night",
            OrderPeriod::Morning => "Morning",
            OrderPeriod::Afternoon => "Afternoon",
            OrderPeriod::Evening => "Evening",
        }
    }
}

impl fmt::Display for OrderPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the enriched table: typed source columns plus the derived
/// `order_year`, `order_hour` and `order_period`.
///
/// A blank id stays `None`: such rows never count as an order or a customer.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRecord {
    pub order_id: Option<String>,
    pub customer_unique_id: Option<String>,
    pub purchased_at: NaiveDateTime,
    pub approved_at: Option<NaiveDateTime>,
    pub status: String,
    pub payment_value: Option<f64>,
    pub category: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub order_year: Option<i32>,
    pub order_hour: u32,
    pub order_period: Option<OrderPeriod>,
}

fn display_amount(v: &f64) -> String {
    format_number(*v, 2)
}

fn display_minutes(v: &f64) -> String {
    format_number(*v, 1)
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct MonthlyOrdersRow {
    pub month: String,
    pub order_count: usize,
    #[tabled(display_with = "display_amount")]
    pub payment_value: f64,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct RfmRow {
    pub customer_id: String,
    pub frequency: usize,
    #[tabled(display_with = "display_amount")]
    pub monetary: f64,
    #[tabled(display_with = "display_minutes")]
    pub recency_minute: f64,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct TopCategoryRow {
    pub order_year: i32,
    pub product_category_name_english: String,
    pub order_count: usize,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct PeriodCountRow {
    pub order_period: OrderPeriod,
    pub order_count: usize,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct HourCountRow {
    pub order_hour: u32,
    pub order_count: usize,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct CityCountRow {
    pub city: String,
    pub customer_state: String,
    pub order_count: usize,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct StateCountRow {
    pub state: String,
    pub order_count: usize,
}
