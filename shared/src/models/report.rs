//! Reporting models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Amount;

/// Sum of sale totals within one clock hour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct HourlyTotal {
    pub hour: DateTime<Utc>,
    pub total: Amount,
}
