use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::CapacityError;

/// Closed set of edge-QKD path selection algorithms understood at the
/// experiment boundary.
///
/// The `*Feas` variants behave like their base algorithm restricted to peers
/// with at least one feasible cached path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QkdAlgo {
    Random,
    Spf,
    BestFit,
    RandomFeas,
    SpfFeas,
    BestFitFeas,
}

impl QkdAlgo {
    /// Every legal algorithm, in declaration order.
    pub const fn all() -> [QkdAlgo; 6] {
        [
            QkdAlgo::Random,
            QkdAlgo::Spf,
            QkdAlgo::BestFit,
            QkdAlgo::RandomFeas,
            QkdAlgo::SpfFeas,
            QkdAlgo::BestFitFeas,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            QkdAlgo::Random => "random",
            QkdAlgo::Spf => "spf",
            QkdAlgo::BestFit => "bestfit",
            QkdAlgo::RandomFeas => "randomfeas",
            QkdAlgo::SpfFeas => "spffeas",
            QkdAlgo::BestFitFeas => "bestfitfeas",
        }
    }

    /// True for the variants that pre-filter to feasible peers before
    /// selecting.
    pub const fn is_feasibility_restricted(self) -> bool {
        matches!(
            self,
            QkdAlgo::RandomFeas | QkdAlgo::SpfFeas | QkdAlgo::BestFitFeas
        )
    }

    /// The algorithm with any feasibility restriction stripped.
    pub const fn base(self) -> QkdAlgo {
        match self {
            QkdAlgo::RandomFeas => QkdAlgo::Random,
            QkdAlgo::SpfFeas => QkdAlgo::Spf,
            QkdAlgo::BestFitFeas => QkdAlgo::BestFit,
            other => other,
        }
    }
}

impl fmt::Display for QkdAlgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for QkdAlgo {
    type Err = CapacityError;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        QkdAlgo::all()
            .into_iter()
            .find(|algo| algo.label() == label)
            .ok_or_else(|| {
                let legal: Vec<&str> = QkdAlgo::all().iter().map(|a| a.label()).collect();
                CapacityError::InvalidArgument(format!(
                    "invalid edge QKD algorithm: {label} (valid options are: {})",
                    legal.join(",")
                ))
            })
    }
}
