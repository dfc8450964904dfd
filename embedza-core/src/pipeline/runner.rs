//! Sequential stage executor.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info_span, Instrument};

use crate::error::EmbedError;
use crate::pipeline::stage::{Environment, Stage};

/// Run `stages` in order over `env`.
///
/// Every stage sees the mutations of the ones before it. The first failing
/// stage aborts the pass and its error is returned as-is.
pub async fn run_stages<'a>(
    stages: &[Arc<dyn Stage>],
    mut env: Environment<'a>,
) -> Result<Environment<'a>, EmbedError> {
    for stage in stages {
        let id = stage.metadata().id;
        let start = Instant::now();

        tracing::debug!(stage = id, src = %env.src, "stage start");

        stage
            .run(&mut env)
            .instrument(info_span!("pipeline_stage", stage = id))
            .await
            .inspect_err(|e| tracing::debug!(stage = id, error = %e, "stage failed"))?;

        tracing::debug!(
            stage = id,
            snippets = env.result.snippets.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "stage done"
        );
    }

    Ok(env)
}
