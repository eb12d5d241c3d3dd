// self
use crate::{_prelude::*, obs::CallStage};

/// Future returned by [`CallSpan::instrument`]: wrapped in the span under `tracing`.
#[cfg(feature = "tracing")]
pub type InstrumentedCall<F> = tracing::instrument::Instrumented<F>;
/// Future returned by [`CallSpan::instrument`]: the input future, untouched.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedCall<F> = F;

/// Span covering one pipeline stage for one route. Zero-sized without `tracing`.
#[derive(Clone, Debug)]
pub struct CallSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl CallSpan {
	/// Opens a `refresh_gate.call` span for `stage` on `route`.
	pub fn new(stage: CallStage, route: &str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("refresh_gate.call", stage = stage.as_str(), route);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (stage, route);

			Self {}
		}
	}

	/// Runs `fut` inside the span, re-entering it on every poll.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedCall<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = CallSpan::new(CallStage::Replay, "/orders");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
