// Latency values as reported by the daemon: either `"<n>ms"` or some
// sentinel for "not measured" (`""`, `"TIMEOUT"`, ...).

use std::cmp::Ordering;
use std::fmt;

const MS_SUFFIX: &str = "ms";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Latency {
    Measured(u64),
    Unmeasured(String),
}

impl Latency {
    pub fn parse(raw: &str) -> Self {
        raw.strip_suffix(MS_SUFFIX)
            .and_then(|n| n.trim().parse().ok())
            .map(Latency::Measured)
            .unwrap_or_else(|| Latency::Unmeasured(raw.to_string()))
    }

    pub fn is_measured(&self) -> bool {
        matches!(self, Latency::Measured(_))
    }
}

/// Measured values sort first, ascending by milliseconds; unmeasured values
/// follow in lexicographic order.
impl Ord for Latency {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Latency::Measured(a), Latency::Measured(b)) => a.cmp(b),
            (Latency::Measured(_), Latency::Unmeasured(_)) => Ordering::Less,
            (Latency::Unmeasured(_), Latency::Measured(_)) => Ordering::Greater,
            (Latency::Unmeasured(a), Latency::Unmeasured(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Latency {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Latency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Latency::Measured(ms) => write!(f, "{ms}{MS_SUFFIX}"),
            Latency::Unmeasured(raw) => f.write_str(raw),
        }
    }
}

/// Compare two raw latency strings.
pub fn compare(a: &str, b: &str) -> Ordering {
    Latency::parse(a).cmp(&Latency::parse(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measured_compare_numerically() {
        assert_eq!(compare("45ms", "120ms"), Ordering::Less);
        assert_eq!(compare("300ms", "30ms"), Ordering::Greater);
        assert_eq!(compare("30ms", "30ms"), Ordering::Equal);
    }

    #[test]
    fn measured_beats_unmeasured() {
        assert_eq!(compare("9999ms", "N/A"), Ordering::Less);
        assert_eq!(compare("", "1ms"), Ordering::Greater);
        assert_eq!(compare("TIMEOUT", "0ms"), Ordering::Greater);
    }

    #[test]
    fn unmeasured_fall_back_to_lexicographic() {
        assert_eq!(compare("N/A", "TIMEOUT"), Ordering::Less);
        assert_eq!(compare("TIMEOUT", ""), Ordering::Greater);
    }

    #[test]
    fn garbage_before_suffix_is_unmeasured() {
        assert_eq!(Latency::parse("fastms"), Latency::Unmeasured("fastms".into()));
        assert!(!Latency::parse("ms").is_measured());
    }

    #[test]
    fn ordering_is_total_over_a_mixed_set() {
        let raw = ["120ms", "45ms", "N/A", "30ms", "", "TIMEOUT", "45ms", "7ms"];
        for a in raw {
            for b in raw {
                assert_eq!(compare(a, b), compare(b, a).reverse(), "{a} vs {b}");
                for c in raw {
                    if compare(a, b) != Ordering::Greater && compare(b, c) != Ordering::Greater {
                        assert_ne!(compare(a, c), Ordering::Greater, "{a} <= {b} <= {c}");
                    }
                }
            }
        }
    }

    #[test]
    fn display_round_trips_the_wire_form() {
        assert_eq!(Latency::parse("88ms").to_string(), "88ms");
        assert_eq!(Latency::parse("N/A").to_string(), "N/A");
    }
}
