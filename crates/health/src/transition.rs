//! Admission state machine
//!
//! Pure evaluation of the next state from the current one and the latest
//! signals. The tracker owns when this runs and what it does with the result.

use crate::window::DowntimeWindow;
use killfeed_core::{AdmissionState, ErrorBudget, LoadSignal, Timestamp};
use std::fmt;

/// Static thresholds of the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionPolicy {
    /// Fewer active players than this means the cluster is down
    pub min_active_count: i64,
    pub window: DowntimeWindow,
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        Self {
            min_active_count: 100,
            window: DowntimeWindow::default(),
        }
    }
}

/// Inputs to one evaluation
///
/// `None` means the signal is missing or stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signals {
    pub load: Option<LoadSignal>,
    pub budget: Option<ErrorBudget>,
    pub now: Timestamp,
}

/// Why a state was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    NoLoadSignal,
    LowActiveCount(i64),
    Maintenance,
    WindowOpen,
    WindowClosed,
    BudgetReset,
    Budget(i64),
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::NoLoadSignal => write!(f, "no load signal"),
            Reason::LowActiveCount(count) => write!(f, "active count {} below threshold", count),
            Reason::Maintenance => write!(f, "upstream in VIP mode"),
            Reason::WindowOpen => write!(f, "scheduled downtime window"),
            Reason::WindowClosed => write!(f, "downtime over"),
            Reason::BudgetReset => write!(f, "error budget reset"),
            Reason::Budget(remaining) => write!(f, "error budget remaining {}", remaining),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: AdmissionState,
    pub to: AdmissionState,
    pub reason: Option<Reason>,
}

impl Transition {
    fn to(from: AdmissionState, to: AdmissionState, reason: Reason) -> Self {
        Self {
            from,
            to,
            reason: Some(reason),
        }
    }

    fn stay(state: AdmissionState) -> Self {
        Self {
            from: state,
            to: state,
            reason: None,
        }
    }

    pub fn is_change(&self) -> bool {
        self.from != self.to
    }
}

/// Compute the next admission state
///
/// Precedence: load/maintenance downtime, then the scheduled window, then
/// budget-reset recovery, then the hysteretic budget bands.
pub fn evaluate(current: AdmissionState, signals: &Signals, policy: &AdmissionPolicy) -> Transition {
    use AdmissionState::*;

    match &signals.load {
        None => return Transition::to(current, Downtime, Reason::NoLoadSignal),
        Some(load) if load.maintenance => {
            return Transition::to(current, Downtime, Reason::Maintenance);
        }
        Some(load) if load.active_count < policy.min_active_count => {
            return Transition::to(current, Downtime, Reason::LowActiveCount(load.active_count));
        }
        Some(_) => {}
    }

    let in_window = policy.window.contains(signals.now);
    if current == Downtime {
        return if in_window {
            Transition::stay(Downtime)
        } else {
            Transition::to(Downtime, Green, Reason::WindowClosed)
        };
    }
    if in_window {
        return Transition::to(current, Downtime, Reason::WindowOpen);
    }

    let Some(budget) = signals.budget else {
        return Transition::stay(current);
    };

    if current.is_degraded() && budget.has_reset(signals.now) {
        return Transition::to(current, Green, Reason::BudgetReset);
    }

    let remaining = budget.remaining;
    let next = match current {
        Red if remaining > 20 => Green,
        Red if remaining >= 10 => Yellow,
        Yellow if remaining < 10 => Red,
        Yellow if remaining >= 20 => Green,
        Green if remaining <= 10 => Red,
        Green if remaining <= 20 => Yellow,
        other => other,
    };

    if next == current {
        Transition::stay(current)
    } else {
        Transition::to(current, next, Reason::Budget(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use AdmissionState::*;

    fn noon() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn signals(players: i64, vip: bool, remaining: Option<i64>) -> Signals {
        let now = noon();
        Signals {
            load: Some(LoadSignal::new(players, vip, now)),
            budget: remaining.map(|r| ErrorBudget::new(r, Some(now + Duration::seconds(30)), now)),
            now,
        }
    }

    fn next(current: AdmissionState, remaining: i64) -> AdmissionState {
        evaluate(current, &signals(20_000, false, Some(remaining)), &AdmissionPolicy::default()).to
    }

    #[test]
    fn test_downtime_wins_over_budget() {
        let policy = AdmissionPolicy::default();
        for state in [Green, Yellow, Red, Downtime] {
            for remaining in [0, 15, 100] {
                let low = evaluate(state, &signals(50, false, Some(remaining)), &policy);
                assert_eq!(low.to, Downtime);
                let vip = evaluate(state, &signals(20_000, true, Some(remaining)), &policy);
                assert_eq!(vip.to, Downtime);
            }
        }
    }

    #[test]
    fn test_missing_load_signal_means_downtime() {
        let s = Signals {
            load: None,
            budget: None,
            now: noon(),
        };
        let t = evaluate(Green, &s, &AdmissionPolicy::default());
        assert_eq!(t.to, Downtime);
        assert_eq!(t.reason, Some(Reason::NoLoadSignal));
    }

    #[test]
    fn test_green_demotions() {
        assert_eq!(next(Green, 5), Red);
        assert_eq!(next(Green, 10), Red);
        assert_eq!(next(Green, 11), Yellow);
        assert_eq!(next(Green, 20), Yellow);
        assert_eq!(next(Green, 21), Green);
    }

    #[test]
    fn test_red_promotions() {
        assert_eq!(next(Red, 25), Green);
        assert_eq!(next(Red, 20), Yellow);
        assert_eq!(next(Red, 10), Yellow);
        assert_eq!(next(Red, 9), Red);
    }

    #[test]
    fn test_yellow_band() {
        assert_eq!(next(Yellow, 9), Red);
        assert_eq!(next(Yellow, 10), Yellow);
        assert_eq!(next(Yellow, 19), Yellow);
        assert_eq!(next(Yellow, 20), Green);
    }

    #[test]
    fn test_green_to_red_to_green() {
        let red = next(Green, 5);
        assert_eq!(red, Red);
        assert_eq!(next(red, 25), Green);
    }

    #[test]
    fn test_window_enters_and_leaves_downtime() {
        let policy = AdmissionPolicy::default();
        let mut s = signals(20_000, false, Some(100));

        s.now = Utc.with_ymd_and_hms(2024, 1, 1, 11, 0, 0).unwrap();
        let t = evaluate(Green, &s, &policy);
        assert_eq!((t.to, t.reason), (Downtime, Some(Reason::WindowOpen)));
        assert_eq!(evaluate(Downtime, &s, &policy).to, Downtime);

        s.now = Utc.with_ymd_and_hms(2024, 1, 1, 11, 30, 0).unwrap();
        let t = evaluate(Downtime, &s, &policy);
        assert_eq!((t.to, t.reason), (Green, Some(Reason::WindowClosed)));
    }

    #[test]
    fn test_budget_reset_recovers_degraded_states() {
        let policy = AdmissionPolicy::default();
        let mut s = signals(20_000, false, Some(3));
        s.now = noon() + Duration::seconds(31);

        for state in [Yellow, Red] {
            let t = evaluate(state, &s, &policy);
            assert_eq!((t.to, t.reason), (Green, Some(Reason::BudgetReset)));
        }
        // Green is not "degraded", so the low budget still demotes it
        assert_eq!(evaluate(Green, &s, &policy).to, Red);
    }

    #[test]
    fn test_no_budget_keeps_state() {
        let s = signals(20_000, false, None);
        let t = evaluate(Yellow, &s, &AdmissionPolicy::default());
        assert!(!t.is_change());
        assert_eq!(t.reason, None);
    }
}
