use crate::inference::csp::{BinaryFactor, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How often auctions naming a suit were observed with a given number of
/// honours, and with a given length, in that suit. The tables are data; the
/// defaults come from a corpus of recorded auctions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiddingEvidence {
    pub honor_counts: BTreeMap<Value, f64>,
    pub length_counts: BTreeMap<Value, f64>,
    /// Added to every table entry, so unseen counts keep a small weight.
    pub smoothing: f64,
}

impl Default for BiddingEvidence {
    fn default() -> Self {
        Self {
            honor_counts: BTreeMap::from([
                (0, 36.0),
                (1, 114.0),
                (2, 80.0),
                (3, 44.0),
                (4, 3.0),
            ]),
            length_counts: BTreeMap::from([
                (1, 9.0),
                (2, 21.0),
                (3, 32.0),
                (4, 55.0),
                (5, 92.0),
                (6, 57.0),
                (7, 11.0),
            ]),
            smoothing: 1.0,
        }
    }
}

impl BiddingEvidence {
    /// Evidence that carries no information: every count weighs the same.
    pub fn uninformative() -> Self {
        Self {
            honor_counts: BTreeMap::new(),
            length_counts: BTreeMap::new(),
            smoothing: 1.0,
        }
    }

    pub fn honor_factor(&self) -> BinaryFactor {
        BinaryFactor::Evidence {
            counts: self.honor_counts.clone(),
            smoothing: self.smoothing,
        }
    }

    pub fn length_factor(&self) -> BinaryFactor {
        BinaryFactor::Evidence {
            counts: self.length_counts.clone(),
            smoothing: self.smoothing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tables_weight_with_smoothing() {
        let evidence = BiddingEvidence::default();
        assert_eq!(evidence.honor_factor().weight(1, 0), 37.0);
        assert_eq!(evidence.length_factor().weight(1, 1), 10.0);
        assert_eq!(evidence.length_factor().weight(1, 9), 1.0);
        assert_eq!(evidence.length_factor().weight(0, 5), 0.0);
    }

    #[test]
    fn deserializes_partial_tables() {
        let evidence: BiddingEvidence =
            serde_json::from_str(r#"{"length_counts": {"5": 10.0}, "smoothing": 0.0}"#).unwrap();
        assert_eq!(evidence.length_counts.get(&5), Some(&10.0));
        assert_eq!(evidence.honor_counts.len(), 5);
        assert_eq!(evidence.length_factor().weight(1, 4), 0.0);
    }
}
