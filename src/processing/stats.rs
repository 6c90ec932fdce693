//! Age-distribution aggregation over persisted users.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::IngestionResult;
use crate::store::UserStore;

/// Age buckets. Together they cover every age exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AgeBucket {
    /// `[0, 20)`
    Under20,
    /// `[20, 40]`
    From20To40,
    /// `(40, 60]`
    From40To60,
    /// `(60, ∞)`
    Above60,
}

impl AgeBucket {
    /// All buckets in report order.
    pub const ALL: [AgeBucket; 4] = [
        AgeBucket::Under20,
        AgeBucket::From20To40,
        AgeBucket::From40To60,
        AgeBucket::Above60,
    ];

    /// Classify an age. Anything below 20, negative values included, is `Under20`.
    pub fn classify(age: i64) -> Self {
        match age {
            i64::MIN..=19 => AgeBucket::Under20,
            20..=40 => AgeBucket::From20To40,
            41..=60 => AgeBucket::From40To60,
            _ => AgeBucket::Above60,
        }
    }

    /// Label used in the printed report.
    pub fn label(self) -> &'static str {
        match self {
            AgeBucket::Under20 => "< 20",
            AgeBucket::From20To40 => "20 to 40",
            AgeBucket::From40To60 => "40 to 60",
            AgeBucket::Above60 => "> 60",
        }
    }
}

/// Per-bucket counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AgeHistogram {
    pub under_20: u64,
    pub from_20_to_40: u64,
    pub from_40_to_60: u64,
    pub above_60: u64,
}

impl AgeHistogram {
    /// Count ages into buckets, skipping absent values.
    pub fn from_ages<'a>(ages: impl IntoIterator<Item = &'a Option<i64>>) -> Self {
        let mut hist = Self::default();
        for bucket in ages.into_iter().filter_map(|a| a.map(AgeBucket::classify)) {
            *hist.count_mut(bucket) += 1;
        }
        hist
    }

    /// Count for a single bucket.
    pub fn count(&self, bucket: AgeBucket) -> u64 {
        match bucket {
            AgeBucket::Under20 => self.under_20,
            AgeBucket::From20To40 => self.from_20_to_40,
            AgeBucket::From40To60 => self.from_40_to_60,
            AgeBucket::Above60 => self.above_60,
        }
    }

    fn count_mut(&mut self, bucket: AgeBucket) -> &mut u64 {
        match bucket {
            AgeBucket::Under20 => &mut self.under_20,
            AgeBucket::From20To40 => &mut self.from_20_to_40,
            AgeBucket::From40To60 => &mut self.from_40_to_60,
            AgeBucket::Above60 => &mut self.above_60,
        }
    }

    /// Number of classified ages.
    pub fn classified(&self) -> u64 {
        AgeBucket::ALL.iter().map(|b| self.count(*b)).sum()
    }
}

/// Result of one aggregation run.
#[derive(Debug, Clone, PartialEq)]
pub enum AgeDistribution {
    /// The store holds no records; no percentages were computed.
    NoData,
    /// Bucket counts over `total` stored records.
    Buckets { total: u64, histogram: AgeHistogram },
}

impl AgeDistribution {
    /// Build a distribution from raw stored ages.
    ///
    /// The denominator is the number of stored records, including any skipped defensively.
    pub fn from_ages(ages: &[Option<i64>]) -> Self {
        if ages.is_empty() {
            return AgeDistribution::NoData;
        }
        AgeDistribution::Buckets {
            total: ages.len() as u64,
            histogram: AgeHistogram::from_ages(ages),
        }
    }

    /// Percentage of the total per bucket, rounded to two decimals. `None` for [`Self::NoData`].
    pub fn percentages(&self) -> Option<[(AgeBucket, f64); 4]> {
        match self {
            AgeDistribution::NoData => None,
            AgeDistribution::Buckets { total, histogram } => Some(AgeBucket::ALL.map(|bucket| {
                let pct = histogram.count(bucket) as f64 / *total as f64 * 100.0;
                (bucket, round2(pct))
            })),
        }
    }
}

impl fmt::Display for AgeDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.percentages() {
            None => write!(f, "No users to calculate stats."),
            Some(rows) => {
                write!(f, "Age-Group - % Distribution")?;
                for (bucket, pct) in rows {
                    write!(f, "\n{} - {:.2}", bucket.label(), pct)?;
                }
                Ok(())
            }
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Reads persisted ages and computes the bucketed distribution.
///
/// Read-only: running it twice against an unchanged store gives the same result.
#[derive(Clone)]
pub struct StatisticsAggregator {
    store: Arc<dyn UserStore>,
}

impl fmt::Debug for StatisticsAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatisticsAggregator").finish_non_exhaustive()
    }
}

impl StatisticsAggregator {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Compute the distribution from current store contents.
    pub async fn compute(&self) -> IngestionResult<AgeDistribution> {
        let ages = self.store.fetch_ages().await?;
        debug!(records = ages.len(), "computing age distribution");
        Ok(AgeDistribution::from_ages(&ages))
    }
}
