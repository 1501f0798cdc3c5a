//! How often two sub-categories share an order, and what those orders
//! spend on each.

use std::collections::BTreeMap;

use crate::chart::{data, format, ChartSpec, Mark, Trace};
use crate::color::{ColorScale, Rgb};
use crate::data::loader::{DatasetSource, SUPERSTORE};
use crate::data::model::{Table, Value};
use crate::data::ops::Agg;
use crate::error::Result;

use super::{chart_or_placeholder, Params, Pipeline, SERIES_URL};

const COLUMNS: [&str; 5] = ["Sub-Category 1", "Sub-Category 2", "Orders", "Average 1", "Average 2"];
const LOW: Rgb = Rgb::hex(0xD9D9D9);
const HIGH: Rgb = Rgb::hex(0xB36CC1);

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

pub struct OrderCoOccurrence;

impl Pipeline for OrderCoOccurrence {
    fn id(&self) -> &'static str {
        "2018w14"
    }

    fn title(&self) -> &'static str {
        "Sub-categories bought together"
    }

    fn source_url(&self) -> &'static str {
        SERIES_URL
    }

    fn dataset(&self) -> DatasetSource {
        SUPERSTORE
    }

    fn transform(&self, data: &Table, _params: &Params) -> Result<Table> {
        let per_order = data.group_by(&["Sub-Category", "Order ID"], &[Agg::sum("Sales")])?;
        let mut orders: BTreeMap<String, BTreeMap<Value, f64>> = BTreeMap::new();
        for row in per_order.rows() {
            orders
                .entry(row[0].to_string())
                .or_default()
                .insert(row[1].clone(), row[2].as_f64().unwrap_or(0.0));
        }

        let diagonal: BTreeMap<&str, usize> = orders.iter().map(|(k, v)| (k.as_str(), v.len())).collect();
        let mut names: Vec<&str> = diagonal.keys().copied().collect();
        names.sort_by_key(|n| diagonal[n]);

        let mut out = Table::new(COLUMNS);
        for &first in &names {
            for &second in &names {
                let (a, b) = (&orders[first], &orders[second]);
                let shared: Vec<&Value> = a.keys().filter(|k| b.contains_key(*k)).collect();
                out.push_row(vec![
                    first.into(),
                    second.into(),
                    Value::Integer(shared.len() as i64),
                    mean(shared.iter().map(|k| a[*k])).into(),
                    mean(shared.iter().map(|k| b[*k])).into(),
                ])?;
            }
        }
        Ok(out)
    }

    fn build_chart(&self, derived: &Table, _params: &Params) -> Result<ChartSpec> {
        chart_or_placeholder(derived, &COLUMNS, self.title(), || {
            let first = derived.texts("Sub-Category 1")?;
            let second = derived.texts("Sub-Category 2")?;
            let counts = derived.floats("Orders")?;
            let avg1 = derived.floats("Average 1")?;
            let avg2 = derived.floats("Average 2")?;

            let mut spec = ChartSpec::new(self.title())
                .size(1000, 900)
                .footer("#Workout Wednesday, Week 14, 2018");
            let order: Vec<String> = (0..first.len())
                .filter(|&i| first[i] == second[i])
                .map(|i| first[i].clone())
                .collect();
            {
                let panel = spec.panel_mut(0);
                panel.x.categories = order.clone();
                panel.x.reversed = true;
                panel.y.categories = order;
            }

            let (diag, off): (Vec<usize>, Vec<usize>) = (0..first.len()).partition(|&i| first[i] == second[i]);
            let heatmap = |name: &str, rows: &[usize], scale: ColorScale| {
                Trace::new(
                    name,
                    Mark::Heatmap {
                        z: rows.iter().map(|&i| counts[i]).collect(),
                        scale,
                    },
                )
                .xy(
                    data(rows.iter().map(|&i| first[i].as_str())),
                    data(rows.iter().map(|&i| second[i].as_str())),
                )
                .hide_legend()
            };
            spec.push(
                heatmap("orders", &diag, ColorScale::two(Rgb::WHITE, Rgb::WHITE))
                    .text(diag.iter().map(|&i| format::thousands(counts[i], 0)).collect()),
            );
            spec.push(heatmap("shared orders", &off, ColorScale::two(LOW, HIGH)));

            let best = off
                .iter()
                .copied()
                .filter(|&i| !(avg1[i] + avg2[i]).is_nan())
                .max_by(|&a, &b| {
                    (avg1[a] + avg2[a])
                        .total_cmp(&(avg1[b] + avg2[b]))
                        .then(b.cmp(&a))
                });
            if let Some(i) = best {
                spec.push(
                    Trace::new("highest average sales per order", Mark::markers(8.0))
                        .xy(
                            data([first[i].as_str(), second[i].as_str()]),
                            data([second[i].as_str(), first[i].as_str()]),
                        )
                        .text(vec![
                            format!("{}: {}", first[i], format::currency(avg1[i], 2)),
                            format!("{}: {}", second[i], format::currency(avg2[i], 2)),
                        ])
                        .color(Rgb::BLACK)
                        .hide_legend(),
                );
            }
            Ok(spec)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_support::*;

    fn table() -> Table {
        superstore(vec![
            Order::new(d(2017, 1, 1), "Furniture", "Chairs", 100.0).order("A"),
            Order::new(d(2017, 1, 1), "Furniture", "Chairs", 50.0).order("A"),
            Order::new(d(2017, 1, 1), "Technology", "Phones", 30.0).order("A"),
            Order::new(d(2017, 1, 2), "Furniture", "Chairs", 20.0).order("B"),
            Order::new(d(2017, 1, 3), "Technology", "Phones", 10.0).order("C"),
            Order::new(d(2017, 1, 3), "Office Supplies", "Paper", 5.0).order("C"),
            Order::new(d(2017, 1, 4), "Technology", "Phones", 40.0).order("D"),
        ])
    }

    fn row<'a>(t: &'a Table, a: &str, b: &str) -> &'a [Value] {
        t.rows()
            .iter()
            .find(|r| r[0].as_str() == Some(a) && r[1].as_str() == Some(b))
            .unwrap()
    }

    #[test]
    fn every_pair_is_listed_in_diagonal_order() {
        let t = OrderCoOccurrence.transform(&table(), &Params::new()).unwrap();
        assert_eq!(t.len(), 9);
        // Paper 1 order, Chairs 2, Phones 3
        assert_eq!(t.texts("Sub-Category 1").unwrap()[0], "Paper");
        assert_eq!(t.texts("Sub-Category 1").unwrap()[8], "Phones");
    }

    #[test]
    fn shared_orders_and_averages() {
        let t = OrderCoOccurrence.transform(&table(), &Params::new()).unwrap();
        let chairs_phones = row(&t, "Chairs", "Phones");
        assert_eq!(chairs_phones[2], Value::Integer(1));
        assert_eq!(chairs_phones[3], Value::Float(150.0));
        assert_eq!(chairs_phones[4], Value::Float(30.0));

        let chairs = row(&t, "Chairs", "Chairs");
        assert_eq!(chairs[2], Value::Integer(2));
        assert_eq!(chairs[3], Value::Float(85.0));

        let none = row(&t, "Chairs", "Paper");
        assert_eq!(none[2], Value::Integer(0));
        assert!(none[3].is_null());
    }

    #[test]
    fn marks_the_most_valuable_pair() {
        let t = OrderCoOccurrence.transform(&table(), &Params::new()).unwrap();
        let spec = OrderCoOccurrence.build_chart(&t, &Params::new()).unwrap();
        assert_eq!(spec.panels[0].x.categories, vec!["Paper", "Chairs", "Phones"]);
        assert_eq!(spec.traces[0].len(), 3);
        assert_eq!(spec.traces[1].len(), 6);
        let best = &spec.traces[2];
        assert_eq!(best.text[0], "Chairs: $150.00");
    }
}
