use crate::error::{DashboardError, Result};
use crate::types::{OrderPeriod, OrderRecord, RawRow};
use crate::util::{non_empty, parse_f64_safe, parse_timestamp};
use chrono::{Datelike, NaiveDateTime, Timelike};
use tracing::debug;

/// Turn the raw table into the enriched table.
///
/// Timestamps are parsed and `order_year` (from approval), `order_hour` and
/// `order_period` (from purchase) are attached. One bad cell rejects the
/// whole row set; a blank approval timestamp just leaves the year unset.
pub fn derive_columns(raw: Vec<RawRow>) -> Result<Vec<OrderRecord>> {
    let mut out = Vec::with_capacity(raw.len());
    for (idx, row) in raw.into_iter().enumerate() {
        let row_no = idx + 1;

        let purchase_cell = row.order_purchase_timestamp.as_deref();
        let purchased_at = match non_empty(purchase_cell) {
            Some(s) => timestamp(row_no, "order_purchase_timestamp", s)?,
            None => {
                return Err(DashboardError::InvalidTimestamp {
                    row: row_no,
                    column: "order_purchase_timestamp",
                    value: purchase_cell.unwrap_or_default().to_string(),
                })
            }
        };
        let approved_at = non_empty(row.order_approved_at.as_deref())
            .map(|s| timestamp(row_no, "order_approved_at", s))
            .transpose()?;

        let payment_value = match non_empty(row.payment_value.as_deref()) {
            Some(s) => Some(parse_f64_safe(s).ok_or_else(|| DashboardError::InvalidNumber {
                row: row_no,
                column: "payment_value",
                value: s.to_string(),
            })?),
            None => None,
        };

        let order_hour = purchased_at.hour();
        out.push(OrderRecord {
            order_id: owned(row.order_id.as_deref()),
            customer_unique_id: owned(row.customer_unique_id.as_deref()),
            purchased_at,
            approved_at,
            status: non_empty(row.order_status.as_deref())
                .unwrap_or_default()
                .to_string(),
            payment_value,
            category: owned(row.product_category_name_english.as_deref()),
            city: owned(row.customer_city.as_deref()),
            state: owned(row.customer_state.as_deref()),
            order_year: approved_at.map(|ts| ts.year()),
            order_hour,
            order_period: OrderPeriod::from_hour(order_hour),
        });
    }
    debug!(rows = out.len(), "derived order_year, order_hour, order_period");
    Ok(out)
}

fn timestamp(row: usize, column: &'static str, value: &str) -> Result<NaiveDateTime> {
    parse_timestamp(value).ok_or_else(|| DashboardError::InvalidTimestamp {
        row,
        column,
        value: value.to_string(),
    })
}

fn owned(cell: Option<&str>) -> Option<String> {
    non_empty(cell).map(str::to_string)
}
