/// Data layer: core types, loading, filtering and table operations.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Table (typed columns, dates parsed)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  apply per-column selections → filtered rows
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │   ops     │  derive / group / pivot / sort / running windows
///   └──────────┘      (calendar: fiscal years, quarters, weeks)
/// ```

pub mod calendar;
pub mod filter;
pub mod loader;
pub mod model;
pub mod ops;
