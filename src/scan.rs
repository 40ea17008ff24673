//! Runs a set of scanners and merges what they find.
//!
//! A strategy that fails is recorded in [`ScanResult::strategies`] with its
//! error and contributes nothing; the other strategies are unaffected.

use crate::dedup;
use crate::model::{GameCandidate, ScanResult, StrategyReport};
use crate::scanner::{ScanContext, Scanner};
use futures::future::join_all;
use tracing::{debug, info, warn};

/// Runs every supported scanner and returns the merged result.
pub async fn run_scan(ctx: &ScanContext, scanners: &[Box<dyn Scanner>]) -> ScanResult {
    run_scan_with_progress(ctx, scanners, |_| {}).await
}

/// Like [`run_scan`], calling `progress` as each strategy finishes.
pub async fn run_scan_with_progress<F>(
    ctx: &ScanContext,
    scanners: &[Box<dyn Scanner>],
    progress: F,
) -> ScanResult
where
    F: Fn(&StrategyReport) + Sync,
{
    let supported: Vec<&dyn Scanner> = scanners
        .iter()
        .map(|scanner| scanner.as_ref())
        .filter(|scanner| {
            let supported = scanner.is_supported();
            if !supported {
                debug!(scanner = scanner.name(), "not supported on this platform");
            }
            supported
        })
        .collect();

    let outcomes = if ctx.config.parallel && supported.len() > 1 {
        join_all(
            supported
                .iter()
                .map(|scanner| run_strategy(*scanner, ctx, &progress)),
        )
        .await
    } else {
        let mut outcomes = Vec::with_capacity(supported.len());
        for scanner in &supported {
            if ctx.is_cancelled() {
                break;
            }
            outcomes.push(run_strategy(*scanner, ctx, &progress).await);
        }
        outcomes
    };

    let (strategies, lists): (Vec<StrategyReport>, Vec<Vec<GameCandidate>>) =
        outcomes.into_iter().unzip();

    let raw: usize = lists.iter().map(Vec::len).sum();
    let mut games = dedup::merge(lists);
    let merged = games.len();

    let ignore = &ctx.config.ignore;
    games.retain(|game| !ignore.should_ignore_title(&game.display_name));

    info!(
        candidates = raw,
        merged,
        ignored = merged - games.len(),
        "scan finished"
    );

    let mut result = ScanResult::new(games);
    result.strategies = strategies;
    result
}

async fn run_strategy<F>(
    scanner: &dyn Scanner,
    ctx: &ScanContext,
    progress: &F,
) -> (StrategyReport, Vec<GameCandidate>)
where
    F: Fn(&StrategyReport) + Sync,
{
    let (games, error) = match scanner.scan(ctx).await {
        Ok(games) => (games, None),
        Err(e) => {
            warn!(scanner = scanner.name(), error = %e, "scan strategy failed");
            (Vec::new(), Some(format!("{:#}", e)))
        }
    };

    let report = StrategyReport {
        name: scanner.name().to_string(),
        found: games.len(),
        error,
    };
    progress(&report);
    (report, games)
}
