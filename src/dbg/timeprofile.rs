use std::{time::{Instant, Duration}, collections::HashMap, fmt::Display};

/// Aggregated stage timings over many tracking passes
#[derive(Default, Debug, Clone)]
pub struct TimeProfileStatistics {
    /// Durations per stage name
    values: HashMap<&'static str, Vec<Duration>>,
    /// Stage names, in first-seen order
    keys: Vec<&'static str>,
}

impl TimeProfileStatistics {
    pub fn add(&mut self, tp: &TimeProfile) {
        let mut last_time = tp.start;
        for stamp in tp.stamps.iter() {
            let duration = stamp.timestamp - last_time;
            last_time = stamp.timestamp;

            let entry = self.values.entry(stamp.name).or_insert_with(|| {
                self.keys.push(stamp.name);
                Vec::new()
            });
            entry.push(duration);
        }
    }

    /// Number of passes recorded for `stage`
    pub fn count(&self, stage: &str) -> usize {
        self.values.get(stage).map_or(0, Vec::len)
    }
}

impl Display for TimeProfileStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let max_name = self.keys
            .iter()
            .map(|stamp| stamp.len())
            .max()
            .unwrap_or(0);

        writeln!(f, " # {:width$} {:>15} {:>15} {:>15}", "Stage", "Average", "Min", "Max", width=max_name)?;

        for (i, key) in self.keys.iter().enumerate() {
            let Some(entry) = self.values.get(key) else {
                continue;
            };
            let min = entry.iter().min().copied().unwrap_or_default();
            let max = entry.iter().max().copied().unwrap_or_default();
            let sum: f64 = entry.iter().map(Duration::as_secs_f64).sum();
            let avg = sum / entry.len().max(1) as f64;

            writeln!(f, "{:2} {:width$} {:12.6} ms {:12.6} ms {:12.6} ms", i, key, avg * 1e3, min.as_secs_f64() * 1e3, max.as_secs_f64() * 1e3, width=max_name)?;
        }

        Ok(())
    }
}

/// Named timestamps for the stages of one tracking pass
#[derive(Clone, Debug)]
pub struct TimeProfile {
    /// Start timestamp
    start: Instant,
    /// Named timestamps
    stamps: Vec<TimeProfileEntry>,
}

impl Default for TimeProfile {
    fn default() -> Self {
        Self {
            start: Instant::now(),
            stamps: Vec::new(),
        }
    }
}

#[derive(Clone, Debug)]
struct TimeProfileEntry {
    name: &'static str,
    timestamp: Instant,
}

impl TimeProfile {
    /// Record a timestamp right now
    #[inline]
    pub fn stamp(&mut self, name: &'static str) {
        self.stamps.push(TimeProfileEntry {
            name,
            timestamp: Instant::now(),
        });
    }

    /// Stage names recorded so far
    pub fn stages(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.stamps.iter().map(|stamp| stamp.name)
    }
}

impl Display for TimeProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut last_time = self.start;
        for (i, stamp) in self.stamps.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            let parttime = stamp.timestamp - last_time;
            write!(f, "{}={:.3}ms", stamp.name, parttime.as_secs_f64() * 1000.)?;
            last_time = stamp.timestamp;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn statistics_collect_stages() {
        let mut stats = TimeProfileStatistics::default();
        for _ in 0..3 {
            let mut tp = TimeProfile::default();
            tp.stamp("preprocess");
            tp.stamp("detect");
            stats.add(&tp);
        }
        assert_eq!(stats.count("preprocess"), 3);
        assert_eq!(stats.count("detect"), 3);
        assert_eq!(stats.count("motion"), 0);
        let table = stats.to_string();
        assert!(table.contains("preprocess"));
    }

    #[test]
    fn display_lists_stages() {
        let mut tp = TimeProfile::default();
        tp.stamp("a");
        tp.stamp("b");
        assert_eq!(tp.stages().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(tp.to_string().starts_with("a="));
    }
}
