// self
use crate::{obs::RequestOutcome, rate_limit::EndpointClass};

/// Records a request outcome via the global metrics recorder (when enabled).
pub fn record_request_outcome(class: EndpointClass, outcome: RequestOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"fantasy_sports_sdk_request_total",
			"class" => class.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (class, outcome);
	}
}
