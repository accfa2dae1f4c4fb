use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pilot identity: the XContest username operators type, plus the stable
/// numeric id resolved from the pilot directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pilot {
    pub username: String,
    pub id: String,
}

/// A flight reported by the activity source, attributable to a pilot.
///
/// `processed` starts `false` and flips to `true` exactly once, as the last
/// step of flight processing, so that a crash mid-processing causes a safe
/// reprocess on the next cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flight {
    /// Source-assigned flight id.
    pub id: String,
    pub pilot: Pilot,
    pub datetime: DateTime<Utc>,
    pub processed: bool,
}

impl Flight {
    pub fn date(&self) -> chrono::NaiveDate {
        self.datetime.date_naive()
    }
}

impl std::fmt::Display for Flight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "flight {} by {} at {}", self.id, self.pilot.username, self.datetime)
    }
}
