//! Total sales broken down by customer, sub-category or state.

use crate::chart::{data, format, ChartSpec, Mark, Trace};
use crate::color::{ColorScale, Rgb};
use crate::data::loader::{DatasetSource, SUPERSTORE};
use crate::data::model::{Table, Value};
use crate::data::ops::{Agg, SortKey};
use crate::error::{PipelineError, Result};

use super::{chart_or_placeholder, choice_options, ParamKind, ParamSpec, ParamValue, Params, Pipeline, SERIES_URL};

const COLUMNS: [&str; 3] = ["Breakdown", "Sales", "Code"];
const BREAKDOWNS: [(&str, &str); 3] = [
    ("Customer", "Customer Name"),
    ("Sub-Category", "Sub-Category"),
    ("State", "State"),
];
const BAR_COLOR: Rgb = Rgb::hex(0x349A52);

/// Postal abbreviation for each state name in the Superstore data.
pub(crate) const STATE_CODES: [(&str, &str); 51] = [
    ("Alabama", "AL"),
    ("Alaska", "AK"),
    ("Arizona", "AZ"),
    ("Arkansas", "AR"),
    ("California", "CA"),
    ("Colorado", "CO"),
    ("Connecticut", "CT"),
    ("Delaware", "DE"),
    ("District of Columbia", "DC"),
    ("Florida", "FL"),
    ("Georgia", "GA"),
    ("Hawaii", "HI"),
    ("Idaho", "ID"),
    ("Illinois", "IL"),
    ("Indiana", "IN"),
    ("Iowa", "IA"),
    ("Kansas", "KS"),
    ("Kentucky", "KY"),
    ("Louisiana", "LA"),
    ("Maine", "ME"),
    ("Maryland", "MD"),
    ("Massachusetts", "MA"),
    ("Michigan", "MI"),
    ("Minnesota", "MN"),
    ("Mississippi", "MS"),
    ("Missouri", "MO"),
    ("Montana", "MT"),
    ("Nebraska", "NE"),
    ("Nevada", "NV"),
    ("New Hampshire", "NH"),
    ("New Jersey", "NJ"),
    ("New Mexico", "NM"),
    ("New York", "NY"),
    ("North Carolina", "NC"),
    ("North Dakota", "ND"),
    ("Ohio", "OH"),
    ("Oklahoma", "OK"),
    ("Oregon", "OR"),
    ("Pennsylvania", "PA"),
    ("Rhode Island", "RI"),
    ("South Carolina", "SC"),
    ("South Dakota", "SD"),
    ("Tennessee", "TN"),
    ("Texas", "TX"),
    ("Utah", "UT"),
    ("Vermont", "VT"),
    ("Virginia", "VA"),
    ("Washington", "WA"),
    ("West Virginia", "WV"),
    ("Wisconsin", "WI"),
    ("Wyoming", "WY"),
];

pub(crate) fn state_code(state: &str) -> Option<&'static str> {
    STATE_CODES.iter().find(|(name, _)| *name == state).map(|(_, code)| *code)
}

fn breakdown_column(label: &str) -> Result<&'static str> {
    BREAKDOWNS
        .iter()
        .find(|(l, _)| *l == label)
        .map(|(_, column)| *column)
        .ok_or_else(|| PipelineError::invalid_param("breakdown", format!("unknown breakdown '{label}'")))
}

pub struct SalesBreakdown;

impl Pipeline for SalesBreakdown {
    fn id(&self) -> &'static str {
        "2018w19"
    }

    fn title(&self) -> &'static str {
        "Sales breakdown"
    }

    fn source_url(&self) -> &'static str {
        SERIES_URL
    }

    fn dataset(&self) -> DatasetSource {
        SUPERSTORE
    }

    fn params(&self) -> Vec<ParamSpec> {
        let labels: Vec<&str> = BREAKDOWNS.iter().map(|(l, _)| *l).collect();
        vec![ParamSpec::new(
            "breakdown",
            "Breakdown",
            ParamKind::Choice(choice_options(&labels)),
            ParamValue::text("Sub-Category"),
        )]
    }

    fn transform(&self, data: &Table, params: &Params) -> Result<Table> {
        let column = breakdown_column(params.text("breakdown")?)?;
        let is_state = column == "State";
        data.group_by(&[column], &[Agg::sum("Sales")])?
            .rename(column, "Breakdown")?
            .derive("Code", &["Breakdown"], |v| match v[0].as_str() {
                Some(state) if is_state => Value::from(state_code(state)),
                _ => Value::Null,
            })?
            .sort_by(&[SortKey::asc("Sales"), SortKey::asc("Breakdown")])
    }

    fn build_chart(&self, derived: &Table, params: &Params) -> Result<ChartSpec> {
        chart_or_placeholder(derived, &COLUMNS, self.title(), || {
            let label = params.text("breakdown")?;
            let names = derived.texts("Breakdown")?;
            let sales = derived.floats("Sales")?;
            let hover = names
                .iter()
                .zip(&sales)
                .map(|(n, s)| format!("{label}: {n}\nSales: {}", format::currency(*s, 0)))
                .collect();

            if breakdown_column(label)? == "State" {
                let mut spec = ChartSpec::new(format!("Sales by {label}")).size(600, 360);
                spec.show_legend = false;
                let codes = derived.column("Code")?;
                let mapped: Vec<usize> = (0..names.len()).filter(|&i| !codes[i].is_null()).collect();
                for i in (0..names.len()).filter(|i| !mapped.contains(i)) {
                    log::warn!("no state code for '{}', left off the map", names[i]);
                }
                spec.push(
                    Trace::new(
                        "states",
                        Mark::Choropleth {
                            scale: ColorScale::yellow_green(),
                        },
                    )
                    .xy(
                        data(mapped.iter().map(|&i| codes[i].to_string())),
                        data(mapped.iter().map(|&i| sales[i])),
                    )
                    .text(mapped.iter().map(|&i| names[i].clone()).collect()),
                );
                return Ok(spec);
            }

            let (width, height) = match label {
                "Customer" => (500, (names.len() as u32 * 20).max(400)),
                _ => (300, 400),
            };
            let mut spec = ChartSpec::new(format!("Sales by {label}")).size(width, height);
            spec.show_legend = false;
            {
                let panel = spec.panel_mut(0);
                panel.x.tick_format = Some("$,.0f".into());
                panel.y.categories = names.iter().rev().cloned().collect();
            }
            spec.push(
                Trace::new("Sales", Mark::Bar { horizontal: true })
                    .xy(data(sales.iter().copied()), data(names.iter().map(String::as_str)))
                    .text(hover)
                    .color(BAR_COLOR),
            );
            Ok(spec)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::Datum;
    use crate::pipeline::test_support::*;

    fn table() -> Table {
        superstore(vec![
            Order::new(d(2017, 1, 1), "Furniture", "Chairs", 100.0).state("Texas"),
            Order::new(d(2017, 1, 1), "Furniture", "Chairs", 20.0).state("Ohio"),
            Order::new(d(2017, 1, 1), "Technology", "Phones", 30.0).state("Texas").customer("Zed"),
            Order::new(d(2017, 1, 1), "Technology", "Phones", 1.0).state("Atlantis"),
        ])
    }

    fn params(breakdown: &str) -> Params {
        Params::new().with("breakdown", ParamValue::text(breakdown))
    }

    #[test]
    fn grouped_and_sorted_ascending() {
        let t = SalesBreakdown.transform(&table(), &params("Sub-Category")).unwrap();
        assert_eq!(t.columns(), &COLUMNS);
        assert_eq!(t.texts("Breakdown").unwrap(), vec!["Phones", "Chairs"]);
        assert_eq!(t.floats("Sales").unwrap(), vec![31.0, 120.0]);
        assert!(t.value(0, "Code").unwrap().is_null());

        let t = SalesBreakdown.transform(&table(), &params("Customer")).unwrap();
        assert_eq!(t.texts("Breakdown").unwrap(), vec!["Zed", "Aaron Bergman"]);
    }

    #[test]
    fn states_carry_their_codes() {
        assert_eq!(state_code("New York"), Some("NY"));
        let t = SalesBreakdown.transform(&table(), &params("State")).unwrap();
        assert_eq!(t.texts("Breakdown").unwrap(), vec!["Atlantis", "Ohio", "Texas"]);
        assert_eq!(t.texts("Code").unwrap(), vec!["", "OH", "TX"]);
    }

    #[test]
    fn state_breakdown_is_a_map() {
        let p = params("State");
        let t = SalesBreakdown.transform(&table(), &p).unwrap();
        let spec = SalesBreakdown.build_chart(&t, &p).unwrap();
        let trace = &spec.traces[0];
        assert!(matches!(trace.mark, Mark::Choropleth { .. }));
        assert_eq!(trace.x, vec![Datum::from("OH"), Datum::from("TX")]);
        assert_eq!(trace.y, vec![Datum::Number(20.0), Datum::Number(130.0)]);
    }

    #[test]
    fn bars_put_the_largest_on_top() {
        let p = params("Sub-Category");
        let t = SalesBreakdown.transform(&table(), &p).unwrap();
        let spec = SalesBreakdown.build_chart(&t, &p).unwrap();
        assert_eq!(spec.panels[0].y.categories, vec!["Chairs", "Phones"]);
        assert_eq!(spec.traces[0].color, BAR_COLOR);
    }
}
