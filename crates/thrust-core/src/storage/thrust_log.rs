use core::fmt::{self, Write};

use alloc::collections::{TryReserveError, VecDeque};
use alloc::string::String;
use serde::{Deserialize, Serialize};

use super::Sample;

/// First line of every exported log
pub const CSV_HEADER: &str = "Time (ms),Weight (kg)\n";

/// Capacity policy for the in-memory thrust log
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogPolicy {
    /// Grow for the lifetime of the process.
    ///
    /// Growth is fallible: when the allocator refuses, the sample is dropped
    /// and counted instead of aborting the firmware.
    #[default]
    Unbounded,
    /// Keep only the newest `capacity` samples.
    Ring { capacity: usize },
}

/// Result of appending one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Appended {
    Stored,
    /// Stored after evicting the oldest sample
    Evicted,
    /// Not stored; the allocator refused to grow the log
    OutOfMemory,
}

/// Append-only thrust-time log.
///
/// Samples are stored structurally and rendered to CSV on export, so repeated
/// exports without intervening appends are byte-identical.
#[derive(Debug, Default)]
pub struct ThrustLog {
    samples: VecDeque<Sample>,
    policy: LogPolicy,
    /// Samples lost to eviction or allocation failure
    dropped: u32,
}

impl ThrustLog {
    pub fn new(policy: LogPolicy) -> Self {
        let samples = match policy {
            LogPolicy::Unbounded => VecDeque::new(),
            LogPolicy::Ring { capacity } => VecDeque::with_capacity(capacity),
        };

        Self {
            samples,
            policy,
            dropped: 0,
        }
    }

    pub fn policy(&self) -> LogPolicy {
        self.policy
    }

    pub fn append(&mut self, sample: Sample) -> Appended {
        match self.policy {
            LogPolicy::Unbounded => {
                if self.samples.try_reserve(1).is_err() {
                    self.dropped = self.dropped.saturating_add(1);
                    return Appended::OutOfMemory;
                }
                self.samples.push_back(sample);
                Appended::Stored
            }
            LogPolicy::Ring { capacity: 0 } => {
                self.dropped = self.dropped.saturating_add(1);
                Appended::Evicted
            }
            LogPolicy::Ring { capacity } => {
                // Oldest is dropped when full
                let evicted = if self.samples.len() >= capacity {
                    self.samples.pop_front();
                    self.dropped = self.dropped.saturating_add(1);
                    true
                } else {
                    false
                };
                self.samples.push_back(sample);
                if evicted {
                    Appended::Evicted
                } else {
                    Appended::Stored
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    pub fn samples(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// Streams the header and every row, oldest first.
    pub fn write_csv<W: Write>(&self, out: &mut W) -> fmt::Result {
        out.write_str(CSV_HEADER)?;
        for sample in &self.samples {
            sample.write_csv_row(out)?;
        }
        Ok(())
    }

    /// Exact byte length of [`Self::write_csv`] output
    pub fn csv_len(&self) -> usize {
        let mut counter = ByteCounter(0);
        // ByteCounter never fails
        let _ = self.write_csv(&mut counter);
        counter.0
    }

    /// Renders the full log into one string sized up front.
    ///
    /// Fails instead of aborting when the heap cannot hold the export.
    pub fn to_csv(&self) -> Result<String, TryReserveError> {
        let mut out = String::new();
        out.try_reserve_exact(self.csv_len())?;
        let _ = self.write_csv(&mut out);
        Ok(out)
    }
}

struct ByteCounter(usize);

impl Write for ByteCounter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0 += s.len();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Weight;

    fn sample(ts: u64, units: i32) -> Sample {
        Sample::new(ts, Weight::from_units(units))
    }

    #[test]
    fn test_empty_log_is_header_only() {
        let log = ThrustLog::default();
        assert_eq!(log.to_csv().unwrap(), "Time (ms),Weight (kg)\n");
        assert_eq!(log.csv_len(), CSV_HEADER.len());
    }

    #[test]
    fn test_rows_in_insertion_order() {
        let mut log = ThrustLog::new(LogPolicy::Unbounded);
        assert_eq!(log.append(sample(100, 0)), Appended::Stored);
        assert_eq!(log.append(sample(200, 15_000)), Appended::Stored);
        assert_eq!(log.append(sample(300, -3)), Appended::Stored);

        assert_eq!(
            log.to_csv().unwrap(),
            "Time (ms),Weight (kg)\n100,0.0000\n200,1.5000\n300,-0.0003\n"
        );
        assert_eq!(log.csv_len(), log.to_csv().unwrap().len());
        assert_eq!(log.dropped(), 0);
    }

    #[test]
    fn test_export_is_repeatable() {
        let mut log = ThrustLog::default();
        for i in 1..=50 {
            log.append(sample(i * 100, (i as i32) * 37));
        }
        assert_eq!(log.to_csv().unwrap(), log.to_csv().unwrap());
    }

    #[test]
    fn test_ring_keeps_newest() {
        let mut log = ThrustLog::new(LogPolicy::Ring { capacity: 3 });
        for ts in [100, 200, 300] {
            assert_eq!(log.append(sample(ts, 1)), Appended::Stored);
        }
        assert_eq!(log.append(sample(400, 1)), Appended::Evicted);
        assert_eq!(log.append(sample(500, 1)), Appended::Evicted);

        let timestamps: Vec<u64> = log.samples().map(|s| s.timestamp_ms).collect();
        assert_eq!(timestamps, vec![300, 400, 500]);
        assert_eq!(log.dropped(), 2);
    }

    #[test]
    fn test_zero_capacity_ring_stores_nothing() {
        let mut log = ThrustLog::new(LogPolicy::Ring { capacity: 0 });
        log.append(sample(100, 1));
        assert!(log.is_empty());
        assert_eq!(log.dropped(), 1);
    }

    #[test]
    fn test_policy_deserializes_from_json() {
        let policy: LogPolicy = serde_json::from_str(r#"{"kind":"ring","capacity":600}"#).unwrap();
        assert_eq!(policy, LogPolicy::Ring { capacity: 600 });

        let policy: LogPolicy = serde_json::from_str(r#"{"kind":"unbounded"}"#).unwrap();
        assert_eq!(policy, LogPolicy::Unbounded);
    }
}
