//! The layered wake mechanisms
//!
//! Three independent techniques keep the machine awake, tried in priority
//! order on every refresh tick. A failure is logged and never aborts the
//! remaining attempts; the collected outcome lets the controller tell a
//! partial failure (fine, something still works) from total degradation
//! (nothing works, must be escalated).

use anyhow::anyhow;
use tracing::warn;

use crate::platform::{InputApi, PowerApi};

pub const SYNTHETIC_INPUT: &str = "synthetic-input";
pub const IDLE_TIMER_RESET: &str = "idle-timer-reset";
pub const CONTINUOUS_ASSERTION: &str = "continuous-assertion";

/// Outcome of one pass over the mechanism list.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub succeeded: Vec<&'static str>,
    pub failed: Vec<&'static str>,
}

impl TickReport {
    /// True when every attempted mechanism failed.
    pub fn all_failed(&self) -> bool {
        self.succeeded.is_empty() && !self.failed.is_empty()
    }
}

/// Emit the wake keypress and the pointer nudge. The mechanism counts as
/// working when either form of synthetic activity got through.
pub(crate) fn attempt_synthetic_input(input: &dyn InputApi, delta_px: i32) -> anyhow::Result<()> {
    let key = input.send_wake_key();
    let pointer = input.nudge_pointer(delta_px);

    match (key, pointer) {
        (Err(key), Err(pointer)) => Err(anyhow!("wake key: {key}; pointer: {pointer}")),
        (Err(e), Ok(())) => {
            warn!(error = %e, "wake key failed, pointer nudge carried the tick");
            Ok(())
        }
        (Ok(()), Err(e)) => {
            warn!(error = %e, "pointer nudge failed, wake key carried the tick");
            Ok(())
        }
        (Ok(()), Ok(())) => Ok(()),
    }
}

/// Attempt all three mechanisms in priority order, collecting outcomes.
pub(crate) fn run_all(power: &dyn PowerApi, input: &dyn InputApi, delta_px: i32) -> TickReport {
    let attempts: [(&'static str, Box<dyn Fn() -> anyhow::Result<()> + '_>); 3] = [
        (
            SYNTHETIC_INPUT,
            Box::new(move || attempt_synthetic_input(input, delta_px)),
        ),
        (IDLE_TIMER_RESET, Box::new(|| power.reset_idle_timer())),
        (CONTINUOUS_ASSERTION, Box::new(|| power.assert_continuous())),
    ];

    let mut report = TickReport::default();
    for (name, attempt) in attempts {
        match attempt() {
            Ok(()) => report.succeeded.push(name),
            Err(e) => {
                warn!(mechanism = name, error = %e, "wake mechanism failed");
                report.failed.push(name);
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::mock::{MockInputApi, MockPowerApi};
    use assert2::assert;

    #[test]
    fn test_all_mechanisms_succeed() {
        let power = MockPowerApi::new();
        let input = MockInputApi::new();

        let report = run_all(&power, &input, 50);
        assert!(report.failed.is_empty());
        assert!(report.succeeded == vec![SYNTHETIC_INPUT, IDLE_TIMER_RESET, CONTINUOUS_ASSERTION]);
        assert!(input.key_taps() == 1);
        assert!(input.nudges() == vec![50]);
        assert!(power.idle_resets() == 1);
        assert!(power.continuous_asserts() == 1);
    }

    #[test]
    fn test_one_failure_does_not_abort_the_rest() {
        let power = MockPowerApi::new();
        let input = MockInputApi::new();
        input.fail_all();

        let report = run_all(&power, &input, 50);
        assert!(report.failed == vec![SYNTHETIC_INPUT]);
        assert!(report.succeeded == vec![IDLE_TIMER_RESET, CONTINUOUS_ASSERTION]);
        assert!(!report.all_failed());
    }

    #[test]
    fn test_total_failure_lists_all_three() {
        let power = MockPowerApi::new();
        let input = MockInputApi::new();
        power.fail_all();
        input.fail_all();

        let report = run_all(&power, &input, 50);
        assert!(report.all_failed());
        assert!(report.failed == vec![SYNTHETIC_INPUT, IDLE_TIMER_RESET, CONTINUOUS_ASSERTION]);
    }

    #[test]
    fn test_synthetic_input_survives_partial_failure() {
        let input = MockInputApi::new();
        input.fail_key.store(true, std::sync::atomic::Ordering::SeqCst);

        assert!(attempt_synthetic_input(&input, 20).is_ok());
        assert!(input.nudges() == vec![20]);
    }

    #[test]
    fn test_synthetic_input_fails_when_both_forms_fail() {
        let input = MockInputApi::new();
        input.fail_all();

        assert!(attempt_synthetic_input(&input, 20).is_err());
    }
}
