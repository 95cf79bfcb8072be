use serde::{Deserialize, Serialize};

use crate::model::Part;

/// Durable progress record for one subject.
///
/// Serialized as `{"index": .., "part": "question"|"answer", "studyTime": ..}`.
/// Missing fields fall back to their defaults when decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PersistedProgress {
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub part: Part,
    #[serde(default, rename = "studyTime")]
    pub study_time: u64,
}
