//! One generation attempt: a single backend call under a hard wall-clock
//! deadline. Every outcome is reported as data; nothing escapes upward.

use bb_core::job::GenerationResult;

use crate::runner::BatchContext;

/// Execute the backend call for one composed prompt and persist the image
/// on success. A missed deadline drops the in-flight call (aborting the
/// underlying request) and reports the item as failed so the rest of the
/// batch keeps moving.
pub(crate) async fn run(ctx: &BatchContext, prompt: &str, seq: usize) -> GenerationResult {
    let deadline = ctx.options.timeout;
    let model = ctx.config.model;

    let call = ctx.backend.generate(prompt, model, &ctx.api_key);
    match tokio::time::timeout(deadline, call).await {
        Ok(Ok(bytes)) => match ctx.store.save(&bytes, &format!("batch_{seq}")) {
            Ok(filename) => GenerationResult::completed(prompt.to_string(), filename, model),
            Err(e) => GenerationResult::failed(
                prompt.to_string(),
                format!("Failed to save image: {e}"),
                model,
            ),
        },
        Ok(Err(e)) => GenerationResult::failed(prompt.to_string(), e.to_string(), model),
        Err(_) => GenerationResult::failed(
            prompt.to_string(),
            format!("Timeout after {} seconds", deadline.as_secs()),
            model,
        ),
    }
}
