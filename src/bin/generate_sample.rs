//! Writes deterministic synthetic versions of the four challenge datasets.
//!
//! ```text
//! cargo run --bin generate_sample -- assets/data
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Datelike, Duration, NaiveDate};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(about = "Generate synthetic challenge datasets")]
struct Args {
    /// Output folder
    #[arg(default_value = "assets/data")]
    out_dir: PathBuf,

    /// Number of Superstore orders
    #[arg(long, default_value_t = 2500)]
    orders: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_f64() * n as f64) as usize % n.max(1)
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.below(items.len())]
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn writer(dir: &Path, file: &str) -> Result<csv::Writer<std::fs::File>> {
    let path = dir.join(file);
    csv::Writer::from_path(&path).with_context(|| format!("creating {}", path.display()))
}

// ---------------------------------------------------------------------------
// Superstore
// ---------------------------------------------------------------------------

const SUB_CATEGORIES: [(&str, &[&str]); 3] = [
    ("Furniture", &["Bookcases", "Chairs", "Furnishings", "Tables"]),
    (
        "Office Supplies",
        &["Appliances", "Art", "Binders", "Envelopes", "Fasteners", "Labels", "Paper", "Storage", "Supplies"],
    ),
    ("Technology", &["Accessories", "Copiers", "Machines", "Phones"]),
];

const STATES: [(&str, &str); 16] = [
    ("California", "West"),
    ("Washington", "West"),
    ("Colorado", "West"),
    ("Texas", "Central"),
    ("Illinois", "Central"),
    ("Michigan", "Central"),
    ("Minnesota", "Central"),
    ("New York", "East"),
    ("Pennsylvania", "East"),
    ("Ohio", "East"),
    ("Massachusetts", "East"),
    ("Florida", "South"),
    ("Georgia", "South"),
    ("Virginia", "South"),
    ("North Carolina", "South"),
    ("Tennessee", "South"),
];

const SEGMENTS: [&str; 3] = ["Consumer", "Corporate", "Home Office"];
const FIRST_NAMES: [&str; 12] = [
    "Aaron", "Beth", "Carlos", "Dana", "Emil", "Fiona", "Grace", "Hector", "Irene", "Jonas", "Karen", "Liam",
];
const LAST_NAMES: [&str; 10] = [
    "Bergman", "Chen", "Diaz", "Evans", "Fischer", "Gupta", "Hale", "Ito", "Jones", "Kowalski",
];

struct Customer {
    id: String,
    name: String,
    segment: &'static str,
    state: (&'static str, &'static str),
}

fn write_superstore(dir: &Path, orders: usize, rng: &mut SimpleRng) -> Result<usize> {
    let customers: Vec<Customer> = (0..FIRST_NAMES.len() * LAST_NAMES.len())
        .map(|i| {
            let first = FIRST_NAMES[i % FIRST_NAMES.len()];
            let last = LAST_NAMES[i / FIRST_NAMES.len()];
            Customer {
                id: format!("{}{}-{:05}", &first[..1], &last[..1], 10000 + i * 7),
                name: format!("{first} {last}"),
                segment: *rng.pick(&SEGMENTS),
                state: *rng.pick(&STATES),
            }
        })
        .collect();

    let start = NaiveDate::from_ymd_opt(2014, 1, 3).context("start date")?;
    let days = 1457;
    let mut out = writer(dir, "superstore.csv")?;
    out.write_record([
        "Row ID", "Order ID", "Order Date", "Ship Date", "Customer ID", "Customer Name", "Segment", "State",
        "Region", "Category", "Sub-Category", "Product Name", "Sales",
    ])?;

    let mut row_id = 0;
    for n in 0..orders {
        // later years carry more orders
        let skew = rng.next_f64().sqrt();
        let date = start + Duration::days((skew * days as f64) as i64);
        let ship = date + Duration::days(rng.below(6) as i64 + 1);
        let customer = &customers[rng.below(customers.len())];
        let order_id = format!("CA-{}-{:06}", date.year(), 100000 + n * 13);
        for _ in 0..=rng.below(4) {
            let (category, subs) = *rng.pick(&SUB_CATEGORIES);
            let sub = *rng.pick(subs);
            let product = format!("{sub} {:03}", rng.below(40) + 1);
            let base = match category {
                "Technology" => 5.6,
                "Furniture" => 5.3,
                _ => 3.6,
            };
            let sales = rng.gauss(base, 0.9).exp();
            row_id += 1;
            out.write_record([
                row_id.to_string(),
                order_id.clone(),
                date.format("%m/%d/%Y").to_string(),
                ship.format("%m/%d/%Y").to_string(),
                customer.id.clone(),
                customer.name.clone(),
                customer.segment.to_string(),
                customer.state.0.to_string(),
                customer.state.1.to_string(),
                category.to_string(),
                sub.to_string(),
                product,
                format!("{sales:.3}"),
            ])?;
        }
    }
    out.flush()?;
    Ok(row_id)
}

// ---------------------------------------------------------------------------
// Survey, names and MLB
// ---------------------------------------------------------------------------

fn write_looks(dir: &Path, rng: &mut SimpleRng) -> Result<usize> {
    let nations = [
        "American", "British", "Chinese", "Egyptian", "French", "German", "Indian", "Indonesian",
        "Italian", "Mexican", "Nigerian", "Spanish", "Swedish", "Vietnamese",
    ];
    let mut out = writer(dir, "looks_vs_personality.csv")?;
    out.write_record(["Nationality", "Gender", "Measure", "Value"])?;
    let mut rows = 0;
    for nation in nations {
        for gender in ["Men", "Women"] {
            let personality = rng.gauss(if gender == "Women" { 72.0 } else { 62.0 }, 8.0).round().clamp(20.0, 95.0);
            for (measure, value) in [
                ("Ranked personality higher than looks", personality),
                ("Ranked looks higher than personality", 100.0 - personality),
            ] {
                out.write_record([nation, gender, measure, &format!("{value:.0}")])?;
                rows += 1;
            }
        }
    }
    out.flush()?;
    Ok(rows)
}

fn write_names(dir: &Path, rng: &mut SimpleRng) -> Result<usize> {
    // (name, peak year, female share)
    let names = [
        ("Rody", 1975, 0.3),
        ("Avery", 2008, 0.8),
        ("Jordan", 1992, 0.25),
        ("Taylor", 1993, 0.7),
        ("Morgan", 1990, 0.85),
        ("Casey", 1985, 0.45),
    ];
    let mut out = writer(dir, "baby_names.csv")?;
    out.write_record(["year", "sex", "name", "n"])?;
    let mut rows = 0;
    for (name, peak, female) in names {
        for year in 1940..=2016 {
            let distance = (year - peak) as f64 / 12.0;
            let total = 4000.0 * (-distance * distance).exp() + rng.gauss(0.0, 20.0).abs();
            for (sex, share) in [("F", female), ("M", 1.0 - female)] {
                let n = (total * share).round() as i64;
                if n >= 5 {
                    out.write_record([year.to_string(), sex.to_string(), name.to_string(), n.to_string()])?;
                    rows += 1;
                }
            }
        }
    }
    out.flush()?;
    Ok(rows)
}

fn write_mlb(dir: &Path, rng: &mut SimpleRng) -> Result<usize> {
    let mut out = writer(dir, "mlb_diversity.csv")?;
    out.write_record(["Year", "Ethnicity", "% of Players"])?;
    let mut rows = 0;
    for year in 1947..=2016 {
        let t = (year - 1947) as f64;
        let colored = if year <= 2004 { 0.02 + t * 0.0062 } else { 0.37 - (year - 2004) as f64 * 0.004 };
        let colored = (colored + rng.gauss(0.0, 0.004)).clamp(0.0, 0.6);
        let shares = [
            ("White", 1.0 - colored),
            ("African American", colored * 0.45),
            ("Latino", colored * 0.5),
            ("Asian", colored * 0.05),
        ];
        for (ethnicity, share) in shares {
            out.write_record([
                year.to_string(),
                ethnicity.to_string(),
                format!("{:.1}%", share * 100.0),
            ])?;
            rows += 1;
        }
    }
    out.flush()?;
    Ok(rows)
}

fn main() -> Result<()> {
    let args = Args::parse();
    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("creating {}", args.out_dir.display()))?;
    let mut rng = SimpleRng::new(args.seed);

    let dir = args.out_dir.as_path();
    let counts = [
        ("superstore.csv", write_superstore(dir, args.orders, &mut rng)?),
        ("looks_vs_personality.csv", write_looks(dir, &mut rng)?),
        ("baby_names.csv", write_names(dir, &mut rng)?),
        ("mlb_diversity.csv", write_mlb(dir, &mut rng)?),
    ];
    for (file, rows) in counts {
        println!("Wrote {rows} rows to {}", dir.join(file).display());
    }
    Ok(())
}
