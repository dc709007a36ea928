//! The aggregation layer.
//!
//! Every function here takes the enriched table as an explicit slice and
//! returns a fresh summary table. Grouping goes through ordered maps so the
//! output order never depends on hashing, and every ranking spells out its
//! tie-break.
use crate::types::{
    CityCountRow, HourCountRow, MonthlyOrdersRow, OrderPeriod, OrderRecord, PeriodCountRow,
    RfmRow, StateCountRow, TopCategoryRow,
};
use chrono::{Datelike, Month, NaiveDateTime};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Categories kept per year by [`generate_top_categories`].
pub const TOP_CATEGORIES_PER_YEAR: usize = 5;

const DELIVERED: &str = "delivered";

/// Rows that count as an order in the plain row counters. A row with no
/// order id is not counted.
fn counted(data: &[OrderRecord]) -> impl Iterator<Item = &OrderRecord> {
    data.iter().filter(|r| r.order_id.is_some())
}

/// All seven aggregate tables, computed together at load time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregates {
    pub monthly_orders: Vec<MonthlyOrdersRow>,
    pub rfm: Vec<RfmRow>,
    pub top_categories: Vec<TopCategoryRow>,
    pub order_count_by_period: Vec<PeriodCountRow>,
    pub order_count_by_hour: Vec<HourCountRow>,
    pub count_by_city: Vec<CityCountRow>,
    pub count_by_state: Vec<StateCountRow>,
}

impl Aggregates {
    pub fn compute(data: &[OrderRecord], report_year: i32) -> Self {
        let aggregates = Aggregates {
            monthly_orders: generate_monthly_orders(data, report_year),
            rfm: generate_rfm(data),
            top_categories: generate_top_categories(data),
            order_count_by_period: count_by_period(data),
            order_count_by_hour: count_by_hour(data),
            count_by_city: count_by_city(data),
            count_by_state: count_by_state(data),
        };
        debug!(
            months = aggregates.monthly_orders.len(),
            customers = aggregates.rfm.len(),
            top_categories = aggregates.top_categories.len(),
            cities = aggregates.count_by_city.len(),
            states = aggregates.count_by_state.len(),
            "aggregates computed"
        );
        aggregates
    }
}

/// Headline numbers printed right after a load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub distinct_orders: usize,
    pub distinct_customers: usize,
    pub unapproved_rows: usize,
}

pub fn generate_load_report(data: &[OrderRecord]) -> LoadReport {
    let orders: BTreeSet<&str> = data.iter().filter_map(|r| r.order_id.as_deref()).collect();
    let customers: BTreeSet<&str> = data
        .iter()
        .filter_map(|r| r.customer_unique_id.as_deref())
        .collect();
    LoadReport {
        total_rows: data.len(),
        distinct_orders: orders.len(),
        distinct_customers: customers.len(),
        unapproved_rows: data.iter().filter(|r| r.approved_at.is_none()).count(),
    }
}

/// Distinct orders and payment total per calendar month of approval, for
/// rows whose `order_year` is `year`.
///
/// Buckets are continuous: every month between the first and the last
/// observed one is emitted, with zeros when nothing was approved in it.
pub fn generate_monthly_orders(data: &[OrderRecord], year: i32) -> Vec<MonthlyOrdersRow> {
    #[derive(Default)]
    struct Acc<'a> {
        orders: BTreeSet<&'a str>,
        payment: f64,
    }

    let mut buckets: BTreeMap<(i32, u32), Acc> = BTreeMap::new();
    for r in data.iter().filter(|r| r.order_year == Some(year)) {
        let Some(approved) = r.approved_at else {
            continue;
        };
        let e = buckets
            .entry((approved.year(), approved.month()))
            .or_default();
        if let Some(id) = r.order_id.as_deref() {
            e.orders.insert(id);
        }
        if let Some(v) = r.payment_value {
            e.payment += v;
        }
    }

    let (Some(&first), Some(&last)) = (buckets.keys().next(), buckets.keys().next_back()) else {
        return Vec::new();
    };

    let mut rows = Vec::new();
    let mut key = first;
    while key <= last {
        let (order_count, payment_value) = buckets
            .get(&key)
            .map(|acc| (acc.orders.len(), acc.payment))
            .unwrap_or((0, 0.0));
        rows.push(MonthlyOrdersRow {
            month: month_name(key.1),
            order_count,
            payment_value,
        });
        key = if key.1 == 12 {
            (key.0 + 1, 1)
        } else {
            (key.0, key.1 + 1)
        };
    }
    rows
}

fn month_name(month: u32) -> String {
    u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .map(|m| m.name().to_string())
        .unwrap_or_default()
}

/// Recency, frequency and monetary value per customer, ordered by customer id.
///
/// Recency is measured against the latest purchase in the whole table, not
/// against the current time. Rows without a customer id are not grouped but
/// still count toward that latest purchase.
pub fn generate_rfm(data: &[OrderRecord]) -> Vec<RfmRow> {
    struct Acc<'a> {
        orders: BTreeSet<&'a str>,
        monetary: f64,
        last_purchase: NaiveDateTime,
    }

    let Some(latest) = data.iter().map(|r| r.purchased_at).max() else {
        return Vec::new();
    };

    let mut map: BTreeMap<&str, Acc> = BTreeMap::new();
    for r in data {
        let Some(customer) = r.customer_unique_id.as_deref() else {
            continue;
        };
        let e = map.entry(customer).or_insert_with(|| Acc {
            orders: BTreeSet::new(),
            monetary: 0.0,
            last_purchase: r.purchased_at,
        });
        if let Some(id) = r.order_id.as_deref() {
            e.orders.insert(id);
        }
        if let Some(v) = r.payment_value {
            e.monetary += v;
        }
        e.last_purchase = e.last_purchase.max(r.purchased_at);
    }

    map.into_iter()
        .map(|(customer, acc)| RfmRow {
            customer_id: customer.to_string(),
            frequency: acc.orders.len(),
            monetary: acc.monetary,
            recency_minute: (latest - acc.last_purchase).num_milliseconds() as f64 / 60_000.0,
        })
        .collect()
}

/// Top delivered categories per approval year.
///
/// Each year keeps at most [`TOP_CATEGORIES_PER_YEAR`] rows. Output runs by
/// year descending, then count descending, then category name ascending.
pub fn generate_top_categories(data: &[OrderRecord]) -> Vec<TopCategoryRow> {
    let mut counts: BTreeMap<i32, BTreeMap<&str, usize>> = BTreeMap::new();
    for r in counted(data).filter(|r| r.status == DELIVERED) {
        let (Some(year), Some(category)) = (r.order_year, r.category.as_deref()) else {
            continue;
        };
        *counts.entry(year).or_default().entry(category).or_insert(0) += 1;
    }

    let mut rows = Vec::new();
    for (year, by_category) in counts.into_iter().rev() {
        let mut ranked: Vec<(&str, usize)> = by_category.into_iter().collect();
        // BTreeMap already yields names ascending; a stable sort keeps that
        // as the tie-break.
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(TOP_CATEGORIES_PER_YEAR);
        rows.extend(ranked.into_iter().map(|(category, order_count)| TopCategoryRow {
            order_year: year,
            product_category_name_english: category.to_string(),
            order_count,
        }));
    }
    rows
}

/// Rows per time-of-day bucket. Always four rows, Night first.
pub fn count_by_period(data: &[OrderRecord]) -> Vec<PeriodCountRow> {
    let mut counts = [0usize; 4];
    for period in counted(data).filter_map(|r| r.order_period) {
        counts[period as usize] += 1;
    }
    OrderPeriod::ALL
        .into_iter()
        .zip(counts)
        .map(|(order_period, order_count)| PeriodCountRow {
            order_period,
            order_count,
        })
        .collect()
}

/// Rows per purchase hour. Always 24 rows, hour 0 first.
pub fn count_by_hour(data: &[OrderRecord]) -> Vec<HourCountRow> {
    let mut counts = [0usize; 24];
    for r in counted(data) {
        if let Some(c) = counts.get_mut(r.order_hour as usize) {
            *c += 1;
        }
    }
    (0u32..)
        .zip(counts)
        .map(|(order_hour, order_count)| HourCountRow {
            order_hour,
            order_count,
        })
        .collect()
}

/// Rows per observed (city, state) pair, ordered by city then state.
pub fn count_by_city(data: &[OrderRecord]) -> Vec<CityCountRow> {
    let mut map: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for r in counted(data) {
        if let (Some(city), Some(state)) = (r.city.as_deref(), r.state.as_deref()) {
            *map.entry((city, state)).or_insert(0) += 1;
        }
    }
    map.into_iter()
        .map(|((city, state), order_count)| CityCountRow {
            city: city.to_string(),
            customer_state: state.to_string(),
            order_count,
        })
        .collect()
}

/// Rows per observed state, ordered by state.
pub fn count_by_state(data: &[OrderRecord]) -> Vec<StateCountRow> {
    let mut map: BTreeMap<&str, usize> = BTreeMap::new();
    for state in counted(data).filter_map(|r| r.state.as_deref()) {
        *map.entry(state).or_insert(0) += 1;
    }
    map.into_iter()
        .map(|(state, order_count)| StateCountRow {
            state: state.to_string(),
            order_count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::parse_timestamp;
    use chrono::Timelike;

    fn order(id: &str, customer: &str, purchased: &str, approved: Option<&str>) -> OrderRecord {
        let purchased_at = parse_timestamp(purchased).unwrap();
        let approved_at = approved.map(|s| parse_timestamp(s).unwrap());
        OrderRecord {
            order_id: Some(id.to_string()),
            customer_unique_id: Some(customer.to_string()),
            purchased_at,
            approved_at,
            status: DELIVERED.to_string(),
            payment_value: Some(1.0),
            category: Some("audio".to_string()),
            city: Some("sao paulo".to_string()),
            state: Some("SP".to_string()),
            order_year: approved_at.map(|ts| ts.year()),
            order_hour: purchased_at.hour(),
            order_period: OrderPeriod::from_hour(purchased_at.hour()),
        }
    }

    fn paid(mut r: OrderRecord, amount: f64) -> OrderRecord {
        r.payment_value = Some(amount);
        r
    }

    fn categorized(mut r: OrderRecord, category: &str) -> OrderRecord {
        r.category = Some(category.to_string());
        r
    }

    fn located(mut r: OrderRecord, city: &str, state: &str) -> OrderRecord {
        r.city = Some(city.to_string());
        r.state = Some(state.to_string());
        r
    }

    fn sample() -> Vec<OrderRecord> {
        vec![
            paid(order("o1", "c1", "2017-12-30 08:00:00", Some("2017-12-30 09:00:00")), 50.0),
            paid(order("o2", "c1", "2018-01-03 13:00:00", Some("2018-01-03 14:00:00")), 10.0),
            paid(order("o2", "c1", "2018-01-03 13:00:00", Some("2018-01-03 14:00:00")), 5.0),
            paid(order("o3", "c2", "2018-03-10 23:30:00", Some("2018-03-11 00:10:00")), 20.0),
            paid(order("o4", "c3", "2018-03-11 04:00:00", None), 7.0),
        ]
    }

    #[test]
    fn monthly_orders_fill_empty_months() {
        let rows = generate_monthly_orders(&sample(), 2018);
        let months: Vec<&str> = rows.iter().map(|r| r.month.as_str()).collect();
        assert_eq!(months, ["January", "February", "March"]);
        assert_eq!(rows[0].order_count, 1);
        assert_eq!(rows[0].payment_value, 15.0);
        assert_eq!(rows[1].order_count, 0);
        assert_eq!(rows[1].payment_value, 0.0);
        assert_eq!(rows[2].order_count, 1);
        assert_eq!(rows[2].payment_value, 20.0);
    }

    #[test]
    fn monthly_counts_sum_to_distinct_orders_of_year() {
        let data = sample();
        let rows = generate_monthly_orders(&data, 2018);
        let total: usize = rows.iter().map(|r| r.order_count).sum();
        let distinct: BTreeSet<&str> = data
            .iter()
            .filter(|r| r.order_year == Some(2018))
            .filter_map(|r| r.order_id.as_deref())
            .collect();
        assert_eq!(total, distinct.len());
    }

    #[test]
    fn monthly_orders_empty_when_year_absent() {
        assert!(generate_monthly_orders(&sample(), 2016).is_empty());
        assert!(generate_monthly_orders(&[], 2018).is_empty());
    }

    #[test]
    fn rfm_sums_and_counts_per_customer() {
        let data = vec![
            paid(order("a", "c1", "2018-01-01 10:00:00", None), 10.0),
            paid(order("b", "c1", "2018-01-02 10:00:00", None), 20.0),
        ];
        let rows = generate_rfm(&data);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].customer_id, "c1");
        assert_eq!(rows[0].frequency, 2);
        assert_eq!(rows[0].monetary, 30.0);
        assert_eq!(rows[0].recency_minute, 0.0);
    }

    #[test]
    fn rfm_recency_is_relative_to_latest_purchase() {
        let rows = generate_rfm(&sample());
        let by_id: BTreeMap<&str, &RfmRow> =
            rows.iter().map(|r| (r.customer_id.as_str(), r)).collect();
        // c3 owns the latest purchase at 2018-03-11 04:00
        assert_eq!(by_id["c3"].recency_minute, 0.0);
        assert_eq!(by_id["c2"].recency_minute, 270.0);
        assert_eq!(by_id["c1"].frequency, 2);
        assert_eq!(by_id["c1"].monetary, 65.0);

        let min = rows
            .iter()
            .map(|r| r.recency_minute)
            .fold(f64::INFINITY, f64::min);
        assert_eq!(min, 0.0);
        assert!(rows.iter().all(|r| r.recency_minute >= 0.0));
    }

    #[test]
    fn rfm_skips_missing_payments() {
        let mut r = order("a", "c1", "2018-01-01 10:00:00", None);
        r.payment_value = None;
        let rows = generate_rfm(&[r]);
        assert_eq!(rows[0].monetary, 0.0);
        assert_eq!(rows[0].frequency, 1);
    }

    #[test]
    fn top_categories_keep_five_per_year() {
        let mut data = Vec::new();
        let categories = [
            ("toys", 6),
            ("audio", 4),
            ("baby", 4),
            ("garden", 3),
            ("health", 2),
            ("auto", 1),
        ];
        for (category, n) in categories {
            for i in 0..n {
                let id = format!("{category}{i}");
                let r = order(&id, "c", "2018-02-01 10:00:00", Some("2018-02-01 11:00:00"));
                data.push(categorized(r, category));
            }
        }
        data.push(categorized(
            order("old", "c", "2017-02-01 10:00:00", Some("2017-02-01 11:00:00")),
            "books",
        ));

        let rows = generate_top_categories(&data);
        let summary: Vec<(i32, &str, usize)> = rows
            .iter()
            .map(|r| (r.order_year, r.product_category_name_english.as_str(), r.order_count))
            .collect();
        assert_eq!(
            summary,
            [
                (2018, "toys", 6),
                (2018, "audio", 4),
                (2018, "baby", 4),
                (2018, "garden", 3),
                (2018, "health", 2),
                (2017, "books", 1),
            ]
        );
    }

    #[test]
    fn top_categories_only_count_delivered() {
        let mut canceled = order("x", "c", "2018-02-01 10:00:00", Some("2018-02-01 11:00:00"));
        canceled.status = "canceled".to_string();
        let unapproved = order("y", "c", "2018-02-01 10:00:00", None);
        assert!(generate_top_categories(&[canceled, unapproved]).is_empty());
    }

    #[test]
    fn top_categories_are_non_increasing_within_year() {
        let rows = generate_top_categories(&sample());
        let mut by_year: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
        for r in &rows {
            by_year.entry(r.order_year).or_default().push(r.order_count);
        }
        for counts in by_year.values() {
            assert!(counts.len() <= TOP_CATEGORIES_PER_YEAR);
            assert!(counts.windows(2).all(|w| w[0] >= w[1]));
        }
    }

    #[test]
    fn period_counts_are_zero_filled() {
        let rows = count_by_period(&sample());
        let summary: Vec<(OrderPeriod, usize)> =
            rows.iter().map(|r| (r.order_period, r.order_count)).collect();
        assert_eq!(
            summary,
            [
                (OrderPeriod::Night, 1),
                (OrderPeriod::Morning, 1),
                (OrderPeriod::Afternoon, 2),
                (OrderPeriod::Evening, 1),
            ]
        );
        let empty = count_by_period(&[]);
        assert_eq!(empty.len(), 4);
        assert!(empty.iter().all(|r| r.order_count == 0));
    }

    #[test]
    fn hour_counts_cover_the_whole_day() {
        let rows = count_by_hour(&sample());
        assert_eq!(rows.len(), 24);
        assert_eq!(rows[13].order_hour, 13);
        assert_eq!(rows[13].order_count, 2);
        assert_eq!(rows[0].order_count, 0);
        assert_eq!(rows.iter().map(|r| r.order_count).sum::<usize>(), 5);
        assert_eq!(count_by_hour(&[]).len(), 24);
    }

    #[test]
    fn location_counts_per_observed_key() {
        let data = vec![
            located(order("a", "c1", "2018-01-01 10:00:00", None), "sao paulo", "SP"),
            located(order("b", "c2", "2018-01-01 10:00:00", None), "campinas", "SP"),
            located(order("c", "c3", "2018-01-01 10:00:00", None), "rio de janeiro", "RJ"),
            located(order("d", "c4", "2018-01-01 10:00:00", None), "sao paulo", "SP"),
        ];
        let cities = count_by_city(&data);
        assert_eq!(cities.len(), 3);
        assert_eq!(cities[0].city, "campinas");
        assert_eq!(cities[2].city, "sao paulo");
        assert_eq!(cities[2].order_count, 2);

        let states = count_by_state(&data);
        assert_eq!(states.len(), 2);
        assert_eq!((states[0].state.as_str(), states[0].order_count), ("RJ", 1));
        assert_eq!((states[1].state.as_str(), states[1].order_count), ("SP", 3));
    }

    #[test]
    fn blank_ids_are_not_orders_or_customers() {
        let mut no_customer = paid(
            order("o1", "c1", "2018-01-05 10:00:00", Some("2018-01-05 11:00:00")),
            1.0,
        );
        no_customer.customer_unique_id = None;
        let mut no_order = paid(
            order("o2", "c2", "2018-01-06 10:00:00", Some("2018-01-06 11:00:00")),
            2.0,
        );
        no_order.order_id = None;
        let data = vec![no_customer, no_order];

        let rfm = generate_rfm(&data);
        assert_eq!(rfm.len(), 1);
        assert_eq!(rfm[0].customer_id, "c2");
        assert_eq!(rfm[0].frequency, 0);
        assert_eq!(rfm[0].monetary, 2.0);

        let monthly = generate_monthly_orders(&data, 2018);
        assert_eq!(monthly.len(), 1);
        assert_eq!(monthly[0].order_count, 1);
        assert_eq!(monthly[0].payment_value, 3.0);

        let periods = count_by_period(&data);
        assert_eq!(periods.iter().map(|r| r.order_count).sum::<usize>(), 1);
        assert_eq!(count_by_state(&data)[0].order_count, 1);

        let report = generate_load_report(&data);
        assert_eq!((report.distinct_orders, report.distinct_customers), (1, 1));
    }

    #[test]
    fn aggregates_are_deterministic() {
        let data = sample();
        assert_eq!(Aggregates::compute(&data, 2018), Aggregates::compute(&data, 2018));
    }

    #[test]
    fn empty_table_degrades_gracefully() {
        let agg = Aggregates::compute(&[], 2018);
        assert!(agg.monthly_orders.is_empty());
        assert!(agg.rfm.is_empty());
        assert!(agg.top_categories.is_empty());
        assert_eq!(agg.order_count_by_period.len(), 4);
        assert_eq!(agg.order_count_by_hour.len(), 24);
        assert!(agg.count_by_city.is_empty());
        assert!(agg.count_by_state.is_empty());
    }

    #[test]
    fn load_report_counts() {
        let report = generate_load_report(&sample());
        assert_eq!(
            report,
            LoadReport {
                total_rows: 5,
                distinct_orders: 4,
                distinct_customers: 3,
                unapproved_rows: 1,
            }
        );
    }
}
