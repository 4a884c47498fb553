use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;

/// Debounce window shipped with the camera screen. Tunable per gate.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(20);

/// A raw read reported by the device scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEvent {
    pub payload: String,
    pub observed_at: DateTime<Utc>,
}

impl ScanEvent {
    pub fn new(payload: impl Into<String>, observed_at: DateTime<Utc>) -> Self {
        Self {
            payload: payload.into(),
            observed_at,
        }
    }
}

/// A scan that passed the gate and may start a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmittedScan {
    pub payload: String,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Within the debounce window of the last admitted scan.
    Debounced,
    /// Older than the last admitted scan.
    OutOfOrder,
    EmptyPayload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanDecision {
    Admitted(AdmittedScan),
    Rejected(Rejection),
}

impl ScanDecision {
    pub fn admitted(self) -> Option<AdmittedScan> {
        match self {
            ScanDecision::Admitted(scan) => Some(scan),
            ScanDecision::Rejected(_) => None,
        }
    }
}

/// Suppresses duplicate reads of a single physical scan.
///
/// The only state kept is the timestamp of the last admitted event. A scan is
/// rejected when it arrives less than `window` after that timestamp, so an
/// event exactly `window` later is admitted. A read carrying the same
/// timestamp as the last admission is always a duplicate.
#[derive(Debug, Clone)]
pub struct ScanGate {
    window: TimeDelta,
    last_admitted: Option<DateTime<Utc>>,
}

impl Default for ScanGate {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl ScanGate {
    pub fn new(window: Duration) -> Self {
        Self {
            window: TimeDelta::from_std(window).unwrap_or(TimeDelta::MAX),
            last_admitted: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window.to_std().unwrap_or_default()
    }

    pub fn last_admitted(&self) -> Option<DateTime<Utc>> {
        self.last_admitted
    }

    pub fn admit(&mut self, event: &ScanEvent) -> ScanDecision {
        if event.payload.trim().is_empty() {
            tracing::trace!("dropping scan with empty payload");
            return ScanDecision::Rejected(Rejection::EmptyPayload);
        }

        if let Some(last) = self.last_admitted {
            let elapsed = event.observed_at.signed_duration_since(last);
            if elapsed < TimeDelta::zero() {
                tracing::trace!(?elapsed, "dropping out-of-order scan");
                return ScanDecision::Rejected(Rejection::OutOfOrder);
            }
            if elapsed == TimeDelta::zero() || elapsed < self.window {
                tracing::trace!(?elapsed, "dropping debounced scan");
                return ScanDecision::Rejected(Rejection::Debounced);
            }
        }

        self.last_admitted = Some(event.observed_at);
        tracing::debug!(payload = %event.payload, "scan admitted");
        ScanDecision::Admitted(AdmittedScan {
            payload: event.payload.clone(),
            observed_at: event.observed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(1_700_000_000_000 + ms).unwrap()
    }

    #[test]
    fn test_first_scan_is_admitted() {
        let mut gate = ScanGate::default();
        let decision = gate.admit(&ScanEvent::new("upi://pay?pa=x@bank", at(0)));
        assert!(matches!(decision, ScanDecision::Admitted(_)));
        assert_eq!(gate.last_admitted(), Some(at(0)));
    }

    #[test]
    fn test_scans_within_window_are_dropped() {
        for window_ms in [1u64, 20, 50, 500] {
            let mut gate = ScanGate::new(Duration::from_millis(window_ms));
            assert!(gate.admit(&ScanEvent::new("a", at(0))).admitted().is_some());
            for offset in 0..window_ms as i64 {
                assert_eq!(
                    gate.admit(&ScanEvent::new("a", at(offset))),
                    ScanDecision::Rejected(Rejection::Debounced),
                    "window {window_ms}ms offset {offset}ms"
                );
            }
        }
    }

    #[test]
    fn test_scan_at_window_boundary_is_admitted() {
        let mut gate = ScanGate::new(Duration::from_millis(20));
        gate.admit(&ScanEvent::new("a", at(0)));
        assert_eq!(
            gate.admit(&ScanEvent::new("a", at(19))),
            ScanDecision::Rejected(Rejection::Debounced)
        );
        assert!(gate.admit(&ScanEvent::new("a", at(20))).admitted().is_some());
    }

    #[test]
    fn test_rejected_scans_do_not_extend_window() {
        let mut gate = ScanGate::new(Duration::from_millis(20));
        gate.admit(&ScanEvent::new("a", at(0)));
        gate.admit(&ScanEvent::new("a", at(15)));
        assert!(gate.admit(&ScanEvent::new("a", at(25))).admitted().is_some());
    }

    #[test]
    fn test_identical_event_admitted_once() {
        let mut gate = ScanGate::new(Duration::ZERO);
        let event = ScanEvent::new("upi://pay?pa=x@bank", at(0));
        assert!(gate.admit(&event).admitted().is_some());
        assert!(gate.admit(&event).admitted().is_none());
        assert!(gate.admit(&event).admitted().is_none());
    }

    #[test]
    fn test_out_of_order_and_empty_payloads() {
        let mut gate = ScanGate::default();
        assert_eq!(
            gate.admit(&ScanEvent::new("   ", at(0))),
            ScanDecision::Rejected(Rejection::EmptyPayload)
        );
        assert_eq!(gate.last_admitted(), None);

        gate.admit(&ScanEvent::new("a", at(100)));
        assert_eq!(
            gate.admit(&ScanEvent::new("a", at(10))),
            ScanDecision::Rejected(Rejection::OutOfOrder)
        );
    }
}
