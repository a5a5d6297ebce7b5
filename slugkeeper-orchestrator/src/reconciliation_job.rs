use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;
use uuid::Uuid;

use crate::reconciliation::Reconciler;
use crate::scheduler::Scheduler;

/// Totals of one pass, for logging and tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassReport {
    pub regions: usize,
    pub existing: usize,
    pub created: usize,
    pub failed: usize,
    pub aborted: bool,
}

/// job-reconcile: one pass at startup, then one per interval, never two at once.
pub async fn run(reconciler: Arc<Reconciler>, interval: Duration) {
    tracing::info!(
        "🔁 job-reconcile started (every {} ms, {} region(s))",
        interval.as_millis(),
        reconciler.desired().regions.len()
    );

    Scheduler::new(interval)
        .run(move || {
            let reconciler = reconciler.clone();
            async move {
                run_pass(&reconciler).await;
            }
        })
        .await;
}

pub async fn run_pass(reconciler: &Reconciler) -> PassReport {
    let pass_id = Uuid::new_v4();
    let span = tracing::info_span!("reconcile_pass", %pass_id);

    async {
        let start = std::time::Instant::now();
        let report = match reconciler.reconcile().await {
            Ok(outcomes) => PassReport {
                regions: outcomes.len(),
                existing: outcomes.iter().map(|o| o.existing).sum(),
                created: outcomes.iter().map(|o| o.created.len()).sum(),
                failed: outcomes.iter().map(|o| o.failures.len()).sum(),
                aborted: false,
            },
            Err(e) => {
                tracing::error!("❌ [job-reconcile] Error: {}", e);
                PassReport {
                    aborted: true,
                    ..PassReport::default()
                }
            }
        };

        if report.failed > 0 {
            tracing::warn!(
                "[job-reconcile] {} creation(s) failed; the next pass recomputes the deficit",
                report.failed
            );
        }
        tracing::info!(
            "[job-reconcile] Pass complete in {} ms: created={} existing={} failed={} regions={}",
            start.elapsed().as_millis(),
            report.created,
            report.existing,
            report.failed,
            report.regions
        );
        report
    }
    .instrument(span)
    .await
}
