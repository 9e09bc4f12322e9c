//! Dashboard aggregations over a lead snapshot.
//!
//! Every function here is pure and total over any finite slice of records,
//! including the empty slice.

use crate::models::{CategoryField, LeadRecord};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Scores strictly above this are high potential.
pub const HIGH_THRESHOLD: f64 = 0.70;
/// Scores at or above this (and not high) are medium potential.
pub const MEDIUM_THRESHOLD: f64 = 0.40;

/// Number of named entries in the job chart before the "Others" bucket.
pub const DEFAULT_TOP_N: usize = 5;

pub const OTHERS_LABEL: &str = "Others";

/// Upper bound and label of one histogram bin.
#[derive(Debug, Clone, Copy)]
pub struct Bin {
    pub label: &'static str,
    /// Inclusive upper bound.
    pub upper: f64,
}

/// Score bins over `score * 100`.
pub const SCORE_BINS: [Bin; 5] = [
    Bin { label: "0-20%", upper: 20.0 },
    Bin { label: "21-40%", upper: 40.0 },
    Bin { label: "41-60%", upper: 60.0 },
    Bin { label: "61-80%", upper: 80.0 },
    Bin { label: "81-100%", upper: f64::INFINITY },
];

pub const AGE_BANDS: [Bin; 6] = [
    Bin { label: "18-25", upper: 25.0 },
    Bin { label: "26-35", upper: 35.0 },
    Bin { label: "36-45", upper: 45.0 },
    Bin { label: "46-55", upper: 55.0 },
    Bin { label: "56-65", upper: 65.0 },
    Bin { label: "65+", upper: f64::INFINITY },
];

/// Errors raised by the aggregation helpers.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    /// A value fell above the last bin's upper bound (or was NaN).
    ValueOutOfRange { record_id: i64, value: f64 },
}

impl fmt::Display for AnalyticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalyticsError::ValueOutOfRange { record_id, value } => write!(
                f,
                "Value {} of lead {} is outside every histogram bin",
                value, record_id
            ),
        }
    }
}

impl std::error::Error for AnalyticsError {}

// ============ Result Types ============

/// Lead counts per score band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KpiCounts {
    pub total: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreBand {
    High,
    Medium,
    Low,
}

impl ScoreBand {
    /// Band of a (clamped) score: low `< 0.40`, medium `[0.40, 0.70]`, high `> 0.70`.
    pub fn of(score: f64) -> Self {
        if score > HIGH_THRESHOLD {
            ScoreBand::High
        } else if score >= MEDIUM_THRESHOLD {
            ScoreBand::Medium
        } else {
            ScoreBand::Low
        }
    }
}

impl KpiCounts {
    pub fn count(&self, band: ScoreBand) -> usize {
        match band {
            ScoreBand::High => self.high,
            ScoreBand::Medium => self.medium,
            ScoreBand::Low => self.low,
        }
    }

    /// Fraction of all leads that fall in `band`, `None` without data.
    pub fn share(&self, band: ScoreBand) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        Some(self.count(band) as f64 / self.total as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketCount {
    pub label: String,
    pub count: usize,
}

/// Everything the analytics page renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsSummary {
    pub kpi: KpiCounts,
    pub top_jobs: Vec<CategoryCount>,
    pub score_distribution: Vec<BucketCount>,
    pub age_groups: Vec<BucketCount>,
    pub financial_profile: Vec<BucketCount>,
}

impl AnalyticsSummary {
    /// True when computed over an empty snapshot.
    pub fn is_empty(&self) -> bool {
        self.kpi.total == 0
    }
}

// ============ Aggregations ============

pub fn kpi_counts(records: &[LeadRecord]) -> KpiCounts {
    records.iter().fold(
        KpiCounts {
            total: records.len(),
            ..KpiCounts::default()
        },
        |mut kpi, record| {
            match ScoreBand::of(record.score()) {
                ScoreBand::High => kpi.high += 1,
                ScoreBand::Medium => kpi.medium += 1,
                ScoreBand::Low => kpi.low += 1,
            }
            kpi
        },
    )
}

/// Most frequent values of `field`, largest first, with the tail folded into "Others".
///
/// Ties keep first-seen order. "Others" is appended only when the tail is non-empty.
pub fn top_categories(
    records: &[LeadRecord],
    field: CategoryField,
    top_n: usize,
) -> Vec<CategoryCount> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<CategoryCount> = Vec::new();

    for record in records {
        let value = field.value(record);
        match index.get(value) {
            Some(&i) => counts[i].count += 1,
            None => {
                index.insert(value, counts.len());
                counts.push(CategoryCount {
                    name: value.to_string(),
                    count: 1,
                });
            }
        }
    }

    // sort_by is stable, so equal counts stay in first-seen order
    counts.sort_by(|a, b| b.count.cmp(&a.count));

    let others: usize = counts.iter().skip(top_n).map(|c| c.count).sum();
    counts.truncate(top_n);
    if others > 0 {
        counts.push(CategoryCount {
            name: OTHERS_LABEL.to_string(),
            count: others,
        });
    }

    counts
}

/// Buckets each record into the first bin whose upper bound `value_fn` does not exceed.
pub fn histogram<F>(
    records: &[LeadRecord],
    value_fn: F,
    bins: &[Bin],
) -> Result<Vec<BucketCount>, AnalyticsError>
where
    F: Fn(&LeadRecord) -> f64,
{
    let mut counts = vec![0usize; bins.len()];

    for record in records {
        let value = value_fn(record);
        let slot = bins
            .iter()
            .position(|bin| value <= bin.upper)
            .ok_or(AnalyticsError::ValueOutOfRange {
                record_id: record.id,
                value,
            })?;
        counts[slot] += 1;
    }

    Ok(bins
        .iter()
        .zip(counts)
        .map(|(bin, count)| BucketCount {
            label: bin.label.to_string(),
            count,
        })
        .collect())
}

/// Zero-count buckets for `bins`, used when a histogram cannot be built.
fn empty_buckets(bins: &[Bin]) -> Vec<BucketCount> {
    bins.iter()
        .map(|bin| BucketCount {
            label: bin.label.to_string(),
            count: 0,
        })
        .collect()
}

/// Runs a histogram over bins whose last bound is unbounded.
fn bounded_histogram<F>(records: &[LeadRecord], value_fn: F, bins: &[Bin]) -> Vec<BucketCount>
where
    F: Fn(&LeadRecord) -> f64,
{
    match histogram(records, value_fn, bins) {
        Ok(buckets) => buckets,
        Err(e) => {
            tracing::error!("Histogram failed on unbounded bins: {}", e);
            empty_buckets(bins)
        }
    }
}

pub fn score_distribution(records: &[LeadRecord]) -> Vec<BucketCount> {
    bounded_histogram(records, |r| r.score() * 100.0, &SCORE_BINS)
}

pub fn age_groups(records: &[LeadRecord]) -> Vec<BucketCount> {
    bounded_histogram(records, |r| f64::from(r.age), &AGE_BANDS)
}

/// Number of records satisfying both predicates.
pub fn cross_tabulate<A, B>(records: &[LeadRecord], pred_a: A, pred_b: B) -> usize
where
    A: Fn(&LeadRecord) -> bool,
    B: Fn(&LeadRecord) -> bool,
{
    records.iter().filter(|r| pred_a(r) && pred_b(r)).count()
}

fn has_housing_loan(record: &LeadRecord) -> bool {
    record.housing == "yes"
}

fn has_personal_loan(record: &LeadRecord) -> bool {
    record.loan == "yes"
}

/// 2x2 loan breakdown. Anything other than a literal "yes" counts as no loan,
/// so the four cells always add up to the snapshot size.
pub fn financial_profile(records: &[LeadRecord]) -> Vec<BucketCount> {
    let cells = [
        (
            "No Loans",
            cross_tabulate(records, |r| !has_housing_loan(r), |r| !has_personal_loan(r)),
        ),
        (
            "Housing Only",
            cross_tabulate(records, has_housing_loan, |r| !has_personal_loan(r)),
        ),
        (
            "Personal Only",
            cross_tabulate(records, |r| !has_housing_loan(r), has_personal_loan),
        ),
        (
            "Double Loans",
            cross_tabulate(records, has_housing_loan, has_personal_loan),
        ),
    ];

    cells
        .into_iter()
        .map(|(label, count)| BucketCount {
            label: label.to_string(),
            count,
        })
        .collect()
}

pub fn summarize(records: &[LeadRecord]) -> AnalyticsSummary {
    AnalyticsSummary {
        kpi: kpi_counts(records),
        top_jobs: top_categories(records, CategoryField::Job, DEFAULT_TOP_N),
        score_distribution: score_distribution(records),
        age_groups: age_groups(records),
        financial_profile: financial_profile(records),
    }
}
