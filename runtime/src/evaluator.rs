//! Per-driver program evaluation.

use crate::prompts;
use crate::requester::ResilientRequester;
use loyalty_core::{Driver, DriverEvaluation, DriverEvaluationFailure, LoyaltyProgram, RequestScope};

/// Scores a program through one driver at a time.
#[derive(Clone, Debug)]
pub struct DriverEvaluator {
    requester: ResilientRequester,
}

impl DriverEvaluator {
    /// Create an evaluator on top of `requester`
    #[must_use]
    pub const fn new(requester: ResilientRequester) -> Self {
        Self { requester }
    }

    /// Evaluate `program` on `driver`.
    ///
    /// The response must cover exactly the driver's sub-drivers with scores
    /// in 1-10; anything else is retried as malformed output.
    ///
    /// # Errors
    ///
    /// Returns [`DriverEvaluationFailure`] naming the driver once the request
    /// fails terminally.
    pub async fn evaluate(
        &self,
        driver: &Driver,
        program: &LoyaltyProgram,
    ) -> Result<DriverEvaluation, DriverEvaluationFailure> {
        let scope = RequestScope::driver(driver.key.clone());
        let messages = prompts::driver_evaluation(driver, program);

        self.requester
            .request_with(messages, &scope, |value| DriverEvaluation::decode(value, driver))
            .await
            .map(|recovered| recovered.value)
            .map_err(|failure| DriverEvaluationFailure {
                driver_key: driver.key.clone(),
                driver_name: driver.name.clone(),
                failure,
            })
    }
}
