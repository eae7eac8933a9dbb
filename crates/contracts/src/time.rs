//! PrecisionTime - timestamp attached to every data packet
//!
//! Mirrors the BULKIO precision UTC time: whole and fractional seconds since
//! the J1970 epoch plus a time-code mode / status pair and a sample offset.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Time code mode
pub const TCM_OFF: u16 = 0;
pub const TCM_CPU: u16 = 1;

/// Time code status
pub const TCS_INVALID: u16 = 0;
pub const TCS_VALID: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrecisionTime {
    /// Time code mode
    pub tcmode: u16,
    /// Time code status
    pub tcstatus: u16,
    /// Fractional sample offset
    pub toff: f64,
    /// Whole seconds since J1970 GMT
    pub twsec: f64,
    /// Fractional seconds, 0.0 <= tfsec < 1.0
    pub tfsec: f64,
}

impl PrecisionTime {
    /// Current wall-clock time, valid CPU time code.
    pub fn now() -> Self {
        let now = Utc::now();
        Self {
            tcmode: TCM_CPU,
            tcstatus: TCS_VALID,
            toff: 0.0,
            twsec: now.timestamp() as f64,
            tfsec: f64::from(now.timestamp_subsec_nanos()) * 1e-9,
        }
    }

    /// Timestamp marked invalid; used for payloads that carry no time (XML).
    pub fn not_set() -> Self {
        Self {
            tcmode: TCM_OFF,
            tcstatus: TCS_INVALID,
            toff: 0.0,
            twsec: 0.0,
            tfsec: 0.0,
        }
    }

    pub fn from_secs(secs: f64) -> Self {
        let whole = secs.floor();
        Self {
            tcmode: TCM_CPU,
            tcstatus: TCS_VALID,
            toff: 0.0,
            twsec: whole,
            tfsec: secs - whole,
        }
    }

    pub fn as_secs(&self) -> f64 {
        self.twsec + self.tfsec
    }

    pub fn is_valid(&self) -> bool {
        self.tcstatus == TCS_VALID && self.tfsec >= 0.0 && self.tfsec < 1.0
    }
}

impl Default for PrecisionTime {
    fn default() -> Self {
        Self::not_set()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_secs_splits_fraction() {
        let t = PrecisionTime::from_secs(12.25);
        assert_eq!(t.twsec, 12.0);
        assert!((t.tfsec - 0.25).abs() < 1e-12);
        assert!(t.is_valid());
        assert!((t.as_secs() - 12.25).abs() < 1e-12);
    }

    #[test]
    fn test_not_set_is_invalid() {
        assert!(!PrecisionTime::not_set().is_valid());
    }

    #[test]
    fn test_now_is_valid() {
        let t = PrecisionTime::now();
        assert!(t.is_valid());
        assert!(t.twsec > 1_600_000_000.0);
    }
}
