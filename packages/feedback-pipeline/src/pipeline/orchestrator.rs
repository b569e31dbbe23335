//! Fixed linear sequencing of the five stages.

use std::time::Instant;
use tracing::{info, instrument, warn};

use super::{Extractor, FeedbackState, Generator, Ingestor, Prioritizer, Stage, Synthesizer};
use crate::deps::PipelineDeps;
use crate::error::Result;
use crate::types::Feedback;

/// ingest → extract → synthesize → generate → prioritize.
///
/// A failing stage stops the run and its error is returned unchanged.
/// Recording the failure on the feedback record is left to the caller.
pub struct FeedbackPipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl FeedbackPipeline {
    pub fn new(deps: &PipelineDeps) -> Self {
        Self {
            stages: vec![
                Box::new(Ingestor::new(deps)),
                Box::new(Extractor::new(deps)),
                Box::new(Synthesizer::new(deps)),
                Box::new(Generator::new(deps)),
                Box::new(Prioritizer::new(deps)),
            ],
        }
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    #[instrument(skip(self, feedback), fields(feedback_id = %feedback.id))]
    pub async fn run(&self, feedback: Feedback) -> Result<FeedbackState> {
        let started = Instant::now();
        let mut state = FeedbackState::new(feedback);

        for stage in &self.stages {
            let stage_started = Instant::now();
            state = match stage.run(state).await {
                Ok(next) => next,
                Err(e) => {
                    warn!(stage = stage.name(), error = %e, "Pipeline stage failed");
                    return Err(e);
                }
            };
            info!(
                stage = stage.name(),
                elapsed_ms = stage_started.elapsed().as_millis() as u64,
                "Pipeline stage completed"
            );
        }

        info!(
            stories = state.stories().len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Pipeline completed"
        );
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_deps;

    #[test]
    fn test_stage_order() {
        let (deps, _) = test_deps();
        assert_eq!(
            FeedbackPipeline::new(&deps).stage_names(),
            vec!["ingest", "extract", "synthesize", "generate", "prioritize"]
        );
    }
}
