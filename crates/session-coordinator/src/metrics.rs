//! Session metrics
//!
//! Emitted through the `metrics` facade; whichever recorder the embedding
//! application installs picks them up. Without a recorder these are no-ops.
//!
//! - `session_refresh_total` (counter): label `outcome`
//! - `session_refresh_waiters_total` (counter): callers that queued behind
//!   an in-flight refresh
//! - `session_stale_replays_total` (counter): expiries answered with an
//!   already-refreshed token
//! - `session_terminations_total` (counter): label `reason`

use crate::error::RefreshError;
use crate::terminator::LogoutReason;

/// Record a settled refresh.
pub fn record_refresh(outcome: &Result<(), &RefreshError>) {
    let label = match outcome {
        Ok(()) => "success",
        Err(e) => e.label(),
    };
    metrics::counter!("session_refresh_total", "outcome" => label).increment(1);
}

pub fn record_waiter_joined() {
    metrics::counter!("session_refresh_waiters_total").increment(1);
}

pub fn record_stale_replay() {
    metrics::counter!("session_stale_replays_total").increment(1);
}

pub fn record_termination(reason: LogoutReason) {
    metrics::counter!("session_terminations_total", "reason" => reason.label()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

    /// Isolated recorder so tests don't fight over the global one.
    fn isolated_recorder() -> (PrometheusRecorder, PrometheusHandle) {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        (recorder, handle)
    }

    #[test]
    fn record_functions_do_not_panic_without_recorder() {
        record_refresh(&Ok(()));
        record_waiter_joined();
        record_stale_replay();
        record_termination(LogoutReason::UserRequested);
    }

    #[test]
    fn refresh_outcomes_are_labelled() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_refresh(&Ok(()));
        record_refresh(&Err(&RefreshError::Aborted));

        let output = handle.render();
        assert!(output.contains("session_refresh_total"));
        assert!(output.contains("outcome=\"success\""));
        assert!(output.contains("outcome=\"aborted\""));
    }

    #[test]
    fn terminations_carry_reason() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_termination(LogoutReason::ForcedByServer);
        record_waiter_joined();

        let output = handle.render();
        assert!(output.contains("reason=\"forced_by_server\""));
        assert!(output.contains("session_refresh_waiters_total"));
    }
}
