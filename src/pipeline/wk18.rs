//! Quarterly customer cohorts and how many of them order again in each
//! following quarter.

use std::collections::{BTreeMap, BTreeSet};

use crate::chart::{data, format, ChartSpec, Mark, Trace};
use crate::color::ColorScale;
use crate::data::calendar::{quarter_label, quarter_ordinal};
use crate::data::loader::{DatasetSource, SUPERSTORE};
use crate::data::model::{Table, Value};
use crate::error::{PipelineError, Result};

use super::{chart_or_placeholder, choice_options, ParamKind, ParamSpec, ParamValue, Params, Pipeline, SERIES_URL};

const COLUMNS: [&str; 3] = ["Cohort", "Quarter", "Retention"];
const LEVELS: [&str; 2] = ["Intermediate", "Jedi"];
const OVERALL: &str = "Overall Retention";

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

fn offset_label(offset: usize) -> String {
    format!("Q{offset}")
}

pub struct CustomerRetention;

impl Pipeline for CustomerRetention {
    fn id(&self) -> &'static str {
        "2018w18"
    }

    fn title(&self) -> &'static str {
        "CUSTOMER RETENTION"
    }

    fn source_url(&self) -> &'static str {
        SERIES_URL
    }

    fn dataset(&self) -> DatasetSource {
        SUPERSTORE
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::new(
            "level",
            "Level",
            ParamKind::Choice(choice_options(&LEVELS)),
            ParamValue::text("Jedi"),
        )]
    }

    /// One row per cohort and quarter offset, preceded by the overall
    /// retention per offset across all cohorts.
    fn transform(&self, data: &Table, _params: &Params) -> Result<Table> {
        let dates = data.dates("Order Date")?;
        let customers = data.column("Customer ID")?;

        let mut labels: BTreeMap<i32, String> = BTreeMap::new();
        let mut buyers: BTreeMap<i32, BTreeSet<&Value>> = BTreeMap::new();
        for (date, customer) in dates.into_iter().zip(customers) {
            let quarter = quarter_ordinal(date);
            labels.entry(quarter).or_insert_with(|| quarter_label(date));
            buyers.entry(quarter).or_default().insert(customer);
        }
        let quarters: Vec<i32> = buyers.keys().copied().collect();

        let mut seen: BTreeSet<&Value> = BTreeSet::new();
        let mut cohorts = Vec::new();
        let mut retained_by_offset = vec![0usize; quarters.len()];
        let mut origin_by_offset = vec![0usize; quarters.len()];
        for (i, quarter) in quarters.iter().enumerate() {
            let origin: BTreeSet<&Value> = buyers[quarter].difference(&seen).copied().collect();
            for (j, later) in quarters.iter().enumerate().skip(i) {
                let retained = origin.intersection(&buyers[later]).count();
                retained_by_offset[j - i] += retained;
                origin_by_offset[j - i] += origin.len();
                let label = labels.get(quarter).cloned().unwrap_or_default();
                cohorts.push(vec![
                    Value::from(label),
                    offset_label(j - i).into(),
                    ratio(retained, origin.len()).into(),
                ]);
            }
            seen.extend(origin);
        }

        let mut out = Table::new(COLUMNS);
        for (offset, (&retained, &origin)) in retained_by_offset.iter().zip(&origin_by_offset).enumerate() {
            out.push_row(vec![
                OVERALL.into(),
                offset_label(offset).into(),
                ratio(retained, origin).into(),
            ])?;
        }
        for row in cohorts {
            out.push_row(row)?;
        }
        Ok(out)
    }

    fn build_chart(&self, derived: &Table, params: &Params) -> Result<ChartSpec> {
        chart_or_placeholder(derived, &COLUMNS, self.title(), || {
            let shown = match params.text("level")? {
                "Intermediate" => derived.filter_rows(|r| {
                    r[0].as_str() != Some(OVERALL) && r[2].as_f64().is_some_and(|v| v != 0.0)
                }),
                "Jedi" => derived.clone(),
                other => {
                    return Err(PipelineError::invalid_param("level", format!("unknown level '{other}'")))
                }
            };
            let cohorts: Vec<String> = shown.unique_in_order("Cohort")?.iter().map(Value::to_string).collect();
            let offsets: Vec<String> = derived.unique_in_order("Quarter")?.iter().map(Value::to_string).collect();
            let retention = shown.floats("Retention")?;

            let mut spec = ChartSpec::new(self.title())
                .size(750, 750)
                .subtitle("BY COHORT AND QUARTER");
            spec.show_legend = false;
            {
                let panel = spec.panel_mut(0);
                panel.x.categories = offsets;
                panel.y.categories = cohorts;
            }
            spec.push(
                Trace::new(
                    "retention",
                    Mark::Heatmap {
                        z: retention.clone(),
                        scale: ColorScale::blue_green(),
                    },
                )
                .xy(
                    data(shown.texts("Quarter")?),
                    data(shown.texts("Cohort")?),
                )
                .text(retention.iter().map(|&r| format::percent(r, 0, false)).collect()),
            );
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
            Order::new(d(2014, 1, 5), "Furniture", "Chairs", 1.0).customer("A"),
            Order::new(d(2014, 2, 5), "Furniture", "Chairs", 1.0).customer("B"),
            Order::new(d(2014, 4, 5), "Furniture", "Chairs", 1.0).customer("A"),
            Order::new(d(2014, 4, 9), "Furniture", "Chairs", 1.0).customer("C"),
            Order::new(d(2014, 8, 1), "Furniture", "Chairs", 1.0).customer("C"),
            Order::new(d(2014, 8, 2), "Furniture", "Chairs", 1.0).customer("B"),
        ])
    }

    fn params(level: &str) -> Params {
        Params::new().with("level", ParamValue::text(level))
    }

    fn retention(t: &Table, cohort: &str, quarter: &str) -> f64 {
        t.rows()
            .iter()
            .find(|r| r[0].as_str() == Some(cohort) && r[1].as_str() == Some(quarter))
            .and_then(|r| r[2].as_f64())
            .unwrap()
    }

    #[test]
    fn cohorts_follow_first_orders() {
        let t = CustomerRetention.transform(&table(), &params("Jedi")).unwrap();
        // 3 overall rows, then 3 + 2 + 1 cohort rows
        assert_eq!(t.len(), 9);
        assert_eq!(t.texts("Cohort").unwrap()[..3], [OVERALL, OVERALL, OVERALL]);
        assert_eq!(retention(&t, "2014 - Q1", "Q0"), 1.0);
        assert_eq!(retention(&t, "2014 - Q1", "Q1"), 0.5);
        assert_eq!(retention(&t, "2014 - Q1", "Q2"), 0.5);
        assert_eq!(retention(&t, "2014 - Q2", "Q1"), 1.0);
        // Q3 brings no new customers
        assert_eq!(retention(&t, "2014 - Q3", "Q0"), 0.0);
    }

    #[test]
    fn overall_pools_every_cohort() {
        let t = CustomerRetention.transform(&table(), &params("Jedi")).unwrap();
        // offset 1: (1 of A,B) + (1 of C) over 3 origins
        assert!((retention(&t, OVERALL, "Q1") - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(retention(&t, OVERALL, "Q2"), 0.5);
    }

    #[test]
    fn intermediate_hides_overall_and_zeros() {
        let p = params("Intermediate");
        let t = CustomerRetention.transform(&table(), &p).unwrap();
        let spec = CustomerRetention.build_chart(&t, &p).unwrap();
        assert_eq!(spec.panels[0].y.categories, vec!["2014 - Q1", "2014 - Q2"]);
        assert_eq!(spec.panels[0].x.categories, vec!["Q0", "Q1", "Q2"]);
        assert_eq!(spec.traces[0].len(), 5);
        assert_eq!(spec.traces[0].text[0], "100%");
    }
}
