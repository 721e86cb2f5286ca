//! Scan result ranking

use analysis_core::ScanResult;

/// Sort by descending score. The sort is stable, so equal scores keep their
/// watchlist order.
pub fn rank_results(results: &mut [ScanResult]) {
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
}
