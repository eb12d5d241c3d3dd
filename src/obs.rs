//! Stage labels shared by the span and counter helpers.
//!
//! Both sinks are compiled out unless their feature is on:
//!
//! - `tracing`: every request, renewal exchange, and replay runs inside a `refresh_gate.call`
//!   span carrying `stage` and `route`; teardown and renewal failures log at `warn`.
//! - `metrics`: `refresh_gate_call_total` counts entries, successes, and failures per `stage`
//!   and `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Where in the call pipeline an observation was taken.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallStage {
	/// First attempt of a caller's request.
	Request,
	/// The refresh-token exchange run by the initiating caller.
	Renewal,
	/// Second and final attempt with a renewed bearer token.
	Replay,
}
impl CallStage {
	/// Label written into the `stage` field.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallStage::Request => "request",
			CallStage::Renewal => "renewal",
			CallStage::Replay => "replay",
		}
	}
}
impl Display for CallStage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// How far a stage got.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallOutcome {
	/// The stage started.
	Attempt,
	/// The stage produced a usable result.
	Success,
	/// The stage ended in an error.
	Failure,
}
impl CallOutcome {
	/// Maps a finished stage's result onto `Success` or `Failure`.
	pub fn of<T, E>(result: &std::result::Result<T, E>) -> Self {
		if result.is_ok() { CallOutcome::Success } else { CallOutcome::Failure }
	}

	/// Label written into the `outcome` field.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallOutcome::Attempt => "attempt",
			CallOutcome::Success => "success",
			CallOutcome::Failure => "failure",
		}
	}
}
impl Display for CallOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
