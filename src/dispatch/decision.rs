//! Schedule decision
//!
//! Evaluated per dispatch, in priority order:
//! 1. a never-schedulable operation family is never scheduled
//! 2. in direct-execution mode only an explicit per-call `schedule` counts
//! 3. in bytes mode the per-call value wins, else the session default

use super::session::{OperationalMode, SessionConfig};

pub fn should_schedule(schedulable: bool, session: &SessionConfig, per_call: Option<bool>) -> bool {
    if !schedulable {
        return false;
    }
    match session.mode {
        OperationalMode::DirectExecution => per_call.unwrap_or(false),
        OperationalMode::ProvideBytes => {
            per_call.unwrap_or(session.schedule_by_default_in_bytes_mode)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn session(mode: OperationalMode, schedule_by_default: bool) -> SessionConfig {
        SessionConfig {
            mode,
            schedule_by_default_in_bytes_mode: schedule_by_default,
            acting_on_behalf_of: None,
        }
    }

    #[test]
    fn test_direct_mode_ignores_session_default() {
        let s = session(OperationalMode::DirectExecution, true);
        assert!(!should_schedule(true, &s, None));
        assert!(should_schedule(true, &s, Some(true)));
        assert!(!should_schedule(true, &s, Some(false)));
    }

    #[test]
    fn test_bytes_mode_default_and_override() {
        let on = session(OperationalMode::ProvideBytes, true);
        assert!(should_schedule(true, &on, None));
        assert!(!should_schedule(true, &on, Some(false)));

        let off = session(OperationalMode::ProvideBytes, false);
        assert!(!should_schedule(true, &off, None));
        assert!(should_schedule(true, &off, Some(true)));
    }

    proptest! {
        #[test]
        fn prop_never_schedulable_wins(
            bytes_mode: bool,
            schedule_by_default: bool,
            per_call in proptest::option::of(any::<bool>()),
        ) {
            let mode = if bytes_mode { OperationalMode::ProvideBytes } else { OperationalMode::DirectExecution };
            let s = session(mode, schedule_by_default);
            prop_assert!(!should_schedule(false, &s, per_call));
        }

        #[test]
        fn prop_explicit_value_wins_for_schedulable(
            bytes_mode: bool,
            schedule_by_default: bool,
            per_call: bool,
        ) {
            let mode = if bytes_mode { OperationalMode::ProvideBytes } else { OperationalMode::DirectExecution };
            let s = session(mode, schedule_by_default);
            prop_assert_eq!(should_schedule(true, &s, Some(per_call)), per_call);
        }
    }
}
