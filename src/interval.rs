use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TrioError;

/// Closed interval of repeat counts, e.g. a genotype confidence interval.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Hash, Eq, PartialEq)]
pub struct Interval {
    pub start: i64,
    pub end: i64,
}

impl Interval {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> i64 {
        self.end - self.start
    }

    /// Touching endpoints count as overlapping.
    pub fn overlaps(&self, other: &Interval) -> bool {
        overlaps(self, other)
    }

    /// Gap between the nearer endpoints, or 0 when the intervals overlap.
    pub fn distance_to(&self, other: &Interval) -> i64 {
        if self.overlaps(other) {
            0
        } else if self.end < other.start {
            other.start - self.end
        } else {
            self.start - other.end
        }
    }

    /// Parse a `/`-joined list of `low-high` intervals, e.g. `"15-17/20-24"`.
    pub fn parse_list(s: &str) -> Result<Vec<Interval>, TrioError> {
        s.split('/').map(|part| part.parse::<Interval>()).collect()
    }
}

impl FromStr for Interval {
    type Err = TrioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || TrioError::MalformedField {
            field: "GenotypeConfidenceInterval",
            value: s.to_string(),
        };

        let (low, high) = s.trim().split_once('-').ok_or_else(malformed)?;
        let start = low.trim().parse().map_err(|_| malformed())?;
        let end = high.trim().parse().map_err(|_| malformed())?;

        Ok(Interval::new(start, end))
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

pub fn overlaps(a: &Interval, b: &Interval) -> bool {
    !(a.end < b.start || b.end < a.start)
}

/// Smallest absolute difference between `point` and any of `points`.
/// Returns `None` when `points` is empty.
pub fn min_distance(point: i64, points: &[i64]) -> Option<i64> {
    points.iter().map(|p| (point - p).abs()).min()
}

/// Smallest distance between `interval` and any of `intervals`.
/// Returns `None` when `intervals` is empty.
pub fn min_distance_ci(interval: &Interval, intervals: &[Interval]) -> Option<i64> {
    intervals.iter().map(|other| interval.distance_to(other)).min()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touching_endpoints_overlap() {
        assert!(overlaps(&Interval::new(10, 20), &Interval::new(20, 30)));
        assert!(overlaps(&Interval::new(20, 30), &Interval::new(10, 20)));
        assert!(!overlaps(&Interval::new(10, 19), &Interval::new(20, 30)));
    }

    #[test]
    fn test_overlaps_is_symmetric() {
        let intervals = [
            Interval::new(0, 5),
            Interval::new(3, 8),
            Interval::new(9, 9),
            Interval::new(5, 12),
            Interval::new(20, 25),
        ];

        for a in &intervals {
            for b in &intervals {
                assert_eq!(overlaps(a, b), overlaps(b, a), "{} vs {}", a, b);
            }
        }
    }

    #[test]
    fn test_distance_to() {
        let a = Interval::new(10, 20);
        assert_eq!(a.distance_to(&Interval::new(15, 40)), 0);
        assert_eq!(a.distance_to(&Interval::new(20, 40)), 0);
        assert_eq!(a.distance_to(&Interval::new(25, 40)), 5);
        assert_eq!(a.distance_to(&Interval::new(1, 7)), 3);
        assert_eq!(Interval::new(25, 40).distance_to(&a), 5);
    }

    #[test]
    fn test_min_distance() {
        assert_eq!(min_distance(17, &[17]), Some(0));
        assert_eq!(min_distance(-4, &[-4]), Some(0));
        assert_eq!(min_distance(15, &[10, 18]), Some(3));
        assert_eq!(min_distance(15, &[]), None);
    }

    #[test]
    fn test_min_distance_ci() {
        let proband = Interval::new(14, 16);
        let parents = [Interval::new(2, 4), Interval::new(19, 22)];
        assert_eq!(min_distance_ci(&proband, &parents), Some(3));
        assert_eq!(min_distance_ci(&proband, &[]), None);
    }

    #[test]
    fn test_parse_list() {
        let intervals = Interval::parse_list("15-17/20-24").unwrap();
        assert_eq!(intervals, vec![Interval::new(15, 17), Interval::new(20, 24)]);
        assert_eq!(intervals[1].length(), 4);
        assert_eq!(intervals[0].to_string(), "15-17");

        assert!(Interval::parse_list("15").is_err());
        assert!(Interval::parse_list("a-b").is_err());
    }
}
