/// Challenge pipelines and the gallery that evaluates them.
///
/// Each challenge is a pure pipeline:
/// ```text
///   Dataset (Arc<Table>) ──transform(params)──▶ Derived Table ──build_chart──▶ ChartSpec
/// ```
/// The [`Gallery`] resolves parameters against the declared whitelist, loads
/// datasets through the injected [`DatasetCache`] and memoizes each
/// evaluation by `(challenge id, resolved params)`.
pub mod params;

mod wk01;
mod wk02;
mod wk03;
mod wk04;
mod wk05;
mod wk06;
mod wk07;
mod wk08;
mod wk09;
mod wk10;
mod wk11;
mod wk12;
mod wk13;
mod wk14;
mod wk15;
mod wk16;
mod wk17;
mod wk18;
mod wk19;

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Datelike;

pub use params::{ParamKind, ParamSpec, ParamValue, Params};
pub(crate) use wk19::STATE_CODES;

use crate::cache::MemoStore;
use crate::chart::ChartSpec;
use crate::data::filter::{self, FilterState};
use crate::data::loader::{DatasetCache, DatasetSource};
use crate::data::model::{Table, Value};
use crate::error::{PipelineError, Result};

// ---------------------------------------------------------------------------
// Pipeline trait
// ---------------------------------------------------------------------------

/// One chart recreation: `Table × Params → Derived Table → ChartSpec`.
///
/// Implementations hold no state; both stages are deterministic for fixed
/// inputs.
pub trait Pipeline: Send + Sync {
    /// Year/week code such as `"2018w05"`.
    fn id(&self) -> &'static str;
    fn title(&self) -> &'static str;
    fn source_url(&self) -> &'static str;
    fn dataset(&self) -> DatasetSource;

    /// Declared parameters with their defaults.
    fn params(&self) -> Vec<ParamSpec> {
        Vec::new()
    }

    /// filter → derive → group/aggregate → sort/reshape.
    fn transform(&self, data: &Table, params: &Params) -> Result<Table>;

    /// Map a derived table onto marks and layout.
    fn build_chart(&self, derived: &Table, params: &Params) -> Result<ChartSpec>;
}

/// All challenges of 2018, weeks 1 through 19.
pub fn registry() -> Vec<Box<dyn Pipeline>> {
    vec![
        Box::new(wk01::LooksVsPersonality),
        Box::new(wk02::FiscalRunningTotals),
        Box::new(wk03::RollingThreeMonths),
        Box::new(wk04::GrowingCustomers),
        Box::new(wk05::QuartersVsMonths),
        Box::new(wk06::SalesByRegion),
        Box::new(wk07::MonthlySubCategories),
        Box::new(wk08::BirthsByName),
        Box::new(wk09::MlbDiversity),
        Box::new(wk10::WeeklySegments),
        Box::new(wk11::SmallMultipleGrids),
        Box::new(wk12::MonthOverMonth),
        Box::new(wk13::SubCategoryByYear),
        Box::new(wk14::OrderCoOccurrence),
        Box::new(wk15::ProductIntroductions),
        Box::new(wk16::PeriodComparison),
        Box::new(wk17::LineStepJump),
        Box::new(wk18::CustomerRetention),
        Box::new(wk19::SalesBreakdown),
    ]
}

// ---------------------------------------------------------------------------
// Shared building blocks
// ---------------------------------------------------------------------------

/// Landing page for challenges without a dedicated write-up link.
pub(crate) const SERIES_URL: &str = "https://workout-wednesday.com/";

/// Years covered by the Superstore sample.
pub(crate) const SUPERSTORE_YEARS: [i64; 4] = [2014, 2015, 2016, 2017];

pub(crate) const CATEGORIES: [&str; 3] = ["Furniture", "Office Supplies", "Technology"];

pub(crate) const SEGMENTS: [&str; 3] = ["Consumer", "Corporate", "Home Office"];

/// Append an integer `Year` column taken from a date column.
pub(crate) fn with_year(table: &Table, date_column: &str, alias: &str) -> Result<Table> {
    table.dates(date_column)?;
    table.derive(alias, &[date_column], |v| {
        v[0].as_date().map(|d| Value::Integer(d.year() as i64)).unwrap_or(Value::Null)
    })
}

/// Keep rows whose order year is in `years` and, when given, whose category
/// is in `categories`. An empty set selects nothing.
pub(crate) fn select_years_and_categories(
    table: &Table,
    years: &BTreeSet<i64>,
    categories: Option<&BTreeSet<String>>,
) -> Result<Table> {
    const YEAR: &str = "__order_year";
    let with_year = with_year(table, "Order Date", YEAR)?;
    let mut filters = FilterState::new();
    filters.insert(YEAR.to_string(), filter::selection(years.iter().copied()));
    if let Some(categories) = categories {
        filters.insert(
            "Category".to_string(),
            filter::selection(categories.iter().map(String::as_str)),
        );
    }
    filter::apply(&with_year, &filters)?.drop_columns(&[YEAR])
}

/// Check the columns a chart reads and short-circuit empty tables to the
/// placeholder chart.
pub(crate) fn chart_or_placeholder(
    derived: &Table,
    required: &[&str],
    title: &str,
    build: impl FnOnce() -> Result<ChartSpec>,
) -> Result<ChartSpec> {
    derived.require(required)?;
    if derived.is_empty() {
        return Ok(ChartSpec::placeholder(title));
    }
    build()
}

pub(crate) fn choice_options(options: &[&str]) -> Vec<String> {
    options.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Gallery – explicit "params changed → recompute" engine
// ---------------------------------------------------------------------------

/// Result of one evaluation, shared with the memo store.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub params: Params,
    pub table: Arc<Table>,
    pub chart: Arc<ChartSpec>,
}

pub struct Gallery {
    pipelines: Vec<Box<dyn Pipeline>>,
    datasets: DatasetCache,
    memo: MemoStore<(String, Params), Evaluation>,
}

impl Gallery {
    pub fn new(datasets: DatasetCache, memo_capacity: usize) -> Self {
        Gallery {
            pipelines: registry(),
            datasets,
            memo: MemoStore::with_capacity(memo_capacity),
        }
    }

    pub fn pipelines(&self) -> &[Box<dyn Pipeline>] {
        &self.pipelines
    }

    pub fn pipeline(&self, id: &str) -> Result<&dyn Pipeline> {
        self.pipelines
            .iter()
            .find(|p| p.id() == id)
            .map(|p| p.as_ref())
            .ok_or_else(|| PipelineError::UnknownChallenge(id.to_string()))
    }

    pub fn datasets(&self) -> &DatasetCache {
        &self.datasets
    }

    /// Point the gallery at another data folder; every cached result is dropped.
    pub fn set_datasets(&mut self, datasets: DatasetCache) {
        log::info!("Using data folder {}", datasets.data_dir().display());
        self.datasets = datasets;
        self.memo.clear();
    }

    /// Seed a dataset without touching the file system.
    #[cfg(test)]
    pub fn seed_dataset(&mut self, source: &DatasetSource, table: Table) {
        self.datasets.insert(source, table);
        self.memo.clear();
    }

    pub fn is_memoized(&self, id: &str, params: &Params) -> Result<bool> {
        let pipeline = self.pipeline(id)?;
        let resolved = Params::resolve(id, &pipeline.params(), params)?;
        Ok(self.memo.contains(&(id.to_string(), resolved)))
    }

    /// Resolve `params`, then return the memoized evaluation or compute it.
    pub fn evaluate(&mut self, id: &str, params: &Params) -> Result<Evaluation> {
        let pipeline = self
            .pipelines
            .iter()
            .find(|p| p.id() == id)
            .ok_or_else(|| PipelineError::UnknownChallenge(id.to_string()))?;
        let resolved = Params::resolve(id, &pipeline.params(), params)?;
        let key = (id.to_string(), resolved.clone());
        let datasets = &mut self.datasets;

        let evaluation = self.memo.get_or_try_insert_with(key, || {
            let data = datasets.get(&pipeline.dataset())?;
            let table = pipeline.transform(&data, &resolved)?;
            let chart = pipeline.build_chart(&table, &resolved)?;
            log::info!("{id}: {} derived rows for {resolved}", table.len());
            Ok::<_, PipelineError>(Evaluation {
                params: resolved.clone(),
                table: Arc::new(table),
                chart: Arc::new(chart),
            })
        })?;
        Ok(evaluation)
    }

    /// Drop the dataset behind one challenge so the next evaluation rereads it.
    /// Memoized results of every challenge are dropped too, since several
    /// challenges share a dataset.
    pub fn reload_dataset(&mut self, id: &str) -> Result<bool> {
        let source = self.pipeline(id)?.dataset();
        let dropped = self.datasets.invalidate(&source);
        self.memo.clear();
        Ok(dropped)
    }

    pub fn clear(&mut self) {
        self.memo.clear();
        self.datasets.clear();
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::data::loader::SUPERSTORE;
    use crate::data::ops::Agg;

    fn gallery() -> Gallery {
        let mut gallery = Gallery::new(DatasetCache::new("/nonexistent"), 8);
        gallery.seed_dataset(&SUPERSTORE, three_orders());
        gallery
    }

    #[test]
    fn registry_ids_are_unique_and_ordered() {
        let ids: Vec<&str> = registry().iter().map(|p| p.id()).collect();
        assert_eq!(ids.len(), 19);
        assert_eq!(ids[0], "2018w01");
        assert_eq!(ids[18], "2018w19");
        let unique: BTreeSet<&str> = ids.iter().copied().collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn every_default_parameter_passes_its_own_check() {
        for pipeline in registry() {
            for spec in pipeline.params() {
                assert!(spec.check(&spec.default).is_ok(), "{} {}", pipeline.id(), spec.name);
            }
        }
    }

    #[test]
    fn years_and_categories_select_one_group() {
        let table = three_orders();
        let selected = select_years_and_categories(
            &table,
            &[2014].into_iter().collect(),
            Some(&["Furniture".to_string()].into_iter().collect()),
        )
        .unwrap();
        assert_eq!(selected.len(), 2);
        let grouped = selected.group_by(&["Category"], &[Agg::sum("Sales")]).unwrap();
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped.floats("Sales").unwrap(), vec![300.0]);
    }

    #[test]
    fn empty_year_selection_is_empty_not_error() {
        let selected =
            select_years_and_categories(&three_orders(), &BTreeSet::new(), None).unwrap();
        assert!(selected.is_empty());
        assert_eq!(selected.columns(), three_orders().columns());
    }

    #[test]
    fn evaluate_memoizes_by_resolved_params() {
        let mut gallery = gallery();
        let first = gallery.evaluate("2018w05", &Params::new()).unwrap();
        assert!(gallery.is_memoized("2018w05", &Params::new()).unwrap());
        let again = gallery
            .evaluate("2018w05", &Params::new().with("ignored", ParamValue::Int(1)))
            .unwrap();
        assert!(Arc::ptr_eq(&first.table, &again.table));
    }

    #[test]
    fn new_params_leave_other_entries_alone() {
        let mut gallery = gallery();
        gallery.evaluate("2018w02", &Params::new()).unwrap();
        let april = Params::new().with("start_month", ParamValue::Int(4));
        gallery.evaluate("2018w02", &april).unwrap();
        assert!(gallery.is_memoized("2018w02", &Params::new()).unwrap());
        assert!(gallery.is_memoized("2018w02", &april).unwrap());
    }

    #[test]
    fn transform_is_idempotent_for_every_superstore_challenge() {
        let table = three_orders();
        for pipeline in registry() {
            if pipeline.dataset().file_name != SUPERSTORE.file_name {
                continue;
            }
            let params = Params::resolve(pipeline.id(), &pipeline.params(), &Params::new()).unwrap();
            let a = pipeline.transform(&table, &params).unwrap();
            let b = pipeline.transform(&table, &params).unwrap();
            assert_eq!(a, b, "{}", pipeline.id());
            pipeline.build_chart(&a, &params).unwrap();
        }
    }

    #[test]
    fn unknown_challenge_and_missing_file() {
        let mut gallery = gallery();
        assert!(matches!(
            gallery.evaluate("2018w99", &Params::new()),
            Err(PipelineError::UnknownChallenge(_))
        ));
        assert!(matches!(
            gallery.evaluate("2018w01", &Params::new()),
            Err(PipelineError::Load { .. })
        ));
    }

    #[test]
    fn reloading_a_dataset_rereads_it() {
        let mut gallery = gallery();
        gallery.evaluate("2018w05", &Params::new()).unwrap();
        assert!(gallery.reload_dataset("2018w05").unwrap());
        assert!(!gallery.is_memoized("2018w05", &Params::new()).unwrap());
        assert!(matches!(
            gallery.evaluate("2018w05", &Params::new()),
            Err(PipelineError::Load { .. })
        ));
    }

    #[test]
    fn invalid_param_is_not_memoized() {
        let mut gallery = gallery();
        let bad = Params::new().with("start_month", ParamValue::Int(0));
        assert!(matches!(
            gallery.evaluate("2018w02", &bad),
            Err(PipelineError::InvalidParam { .. })
        ));
    }
}
