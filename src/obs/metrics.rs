// self
use crate::obs::{CallOutcome, CallStage};

/// Bumps `refresh_gate_call_total{stage, outcome}` on the installed recorder.
///
/// Compiles to nothing without the `metrics` feature.
pub fn record_call_outcome(stage: CallStage, outcome: CallOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"refresh_gate_call_total",
			"stage" => stage.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (stage, outcome);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recording_without_a_recorder_is_harmless() {
		for stage in [CallStage::Request, CallStage::Renewal, CallStage::Replay] {
			record_call_outcome(stage, CallOutcome::Attempt);
			record_call_outcome(stage, CallOutcome::Failure);
		}
	}
}
