//! Quiz flow
//!
//! Each step builds its request from the session, calls the backend and only
//! then applies the outcome. A failed call returns the error and leaves the
//! session exactly as it was, so the same step can be retried.

use tracing::{info, warn};
use tsf_common::api::ReconcileReport;

use crate::client::QuizBackend;
use crate::error::QuizResult;
use crate::guest_cache::GuestCache;
use crate::session::{Level1Choice, QuizSession};

/// Level at which the trait questions are served
pub const QUESTION_LEVEL: u8 = 2;

/// Run the Level-1 filter; returns the candidate count
pub async fn submit_level1<B: QuizBackend + ?Sized>(
    backend: &B,
    session: &mut QuizSession,
    choice: Level1Choice,
) -> QuizResult<usize> {
    let request = session.level1_request(choice)?;
    let response = backend.filter(&request).await?;

    let count = response.ids.len();
    session.apply_level1(choice, response.ids)?;
    info!(?choice, candidates = count, "Level 1 complete");
    Ok(count)
}

/// Fetch the question bank and start Level 2; returns the question count
pub async fn start_level2<B: QuizBackend + ?Sized>(
    backend: &B,
    session: &mut QuizSession,
) -> QuizResult<usize> {
    let questions = backend.questions(QUESTION_LEVEL).await?;
    let count = questions.len();
    session.load_questions(questions)?;
    Ok(count)
}

/// Run the Level-2 filter on the completed answers; returns the result ids
pub async fn submit_level2<B: QuizBackend + ?Sized>(
    backend: &B,
    session: &mut QuizSession,
) -> QuizResult<Vec<i64>> {
    let request = session.level2_request()?;
    let response = backend.filter(&request).await?;

    session.apply_results(response.ids.clone())?;
    info!(
        top = ?session.top_three(),
        results = response.ids.len(),
        "Level 2 complete"
    );
    Ok(response.ids)
}

/// Attach cached guest results to an account.
///
/// Returns `Ok(None)` when there is nothing cached. Once the service has
/// answered, the cache is cleared even if some ids failed; those are listed
/// in the report. When the call cannot be delivered the cache is kept and the
/// error returned, so a later login retries.
pub async fn reconcile_guest_results<B: QuizBackend + ?Sized>(
    backend: &B,
    cache: &GuestCache,
    account: i64,
) -> QuizResult<Option<ReconcileReport>> {
    let ids = cache.load()?;
    if ids.is_empty() {
        return Ok(None);
    }

    let report = match backend.reconcile(account, &ids).await {
        Ok(report) => report,
        Err(e) => {
            warn!(account, error = %e, "Reconciliation not delivered, keeping guest cache");
            return Err(e);
        }
    };

    if !report.failed.is_empty() {
        warn!(account, failed = ?report.failed, "Some guest results could not be attached");
    }
    info!(
        account,
        attached = report.attached.len(),
        already_present = report.already_present.len(),
        failed = report.failed.len(),
        "Guest results reconciled"
    );

    cache.clear()?;
    Ok(Some(report))
}
