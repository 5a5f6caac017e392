use std::fs;
use std::io;
use std::path::Path;

use bridge_core::model::contract::Contract;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};

use crate::config::BenchmarkConfig;
use crate::tournament::BoardOutcome;

const CONFIDENCE_Z: f64 = 1.96; // 95% CI

/// Aggregates board outcomes per lineup. Every lineup plays the same boards
/// in the same order, so results line up pairwise against the first lineup.
pub struct SummaryCollector {
    lineups: Vec<LineupAccumulator>,
    latency_budget_ms: u64,
}

impl SummaryCollector {
    pub fn new(config: &BenchmarkConfig) -> Self {
        let lineups = config
            .lineups
            .iter()
            .map(|lineup| LineupAccumulator::new(lineup.label()))
            .collect();
        Self {
            lineups,
            latency_budget_ms: config.metrics.latency_budget_ms,
        }
    }

    pub fn record(&mut self, lineup_index: usize, contract: &Contract, outcome: &BoardOutcome) {
        if let Some(acc) = self.lineups.get_mut(lineup_index) {
            acc.record(contract, outcome);
        }
    }

    pub fn finish(self) -> TournamentSummary {
        let baseline = self
            .lineups
            .first()
            .map(|acc| acc.tricks.clone())
            .unwrap_or_default();
        let baseline_label = self.lineups.first().map(|acc| acc.label.clone());

        let lineups = self
            .lineups
            .into_iter()
            .enumerate()
            .map(|(index, acc)| {
                let diffs: Vec<f64> = acc
                    .tricks
                    .iter()
                    .zip(&baseline)
                    .map(|(ours, theirs)| ours - theirs)
                    .collect();
                let p_value = if index == 0 {
                    1.0
                } else {
                    wilcoxon_signed_rank(diffs.clone())
                };
                acc.into_report(&diffs, p_value, self.latency_budget_ms)
            })
            .collect();

        TournamentSummary {
            baseline: baseline_label,
            lineups,
            latency_budget_ms: self.latency_budget_ms,
        }
    }
}

struct LineupAccumulator {
    label: String,
    tricks: Vec<f64>,
    made: u32,
    total_ms: f64,
    decisions: u64,
}

impl LineupAccumulator {
    fn new(label: String) -> Self {
        Self {
            label,
            tricks: Vec::new(),
            made: 0,
            total_ms: 0.0,
            decisions: 0,
        }
    }

    fn record(&mut self, contract: &Contract, outcome: &BoardOutcome) {
        self.tricks.push(outcome.declarer_tricks as f64);
        if outcome.made(contract) {
            self.made += 1;
        }
        for metrics in [&outcome.declarer_metrics, &outcome.defender_metrics] {
            self.total_ms += metrics.total_ms;
            self.decisions += u64::from(metrics.decisions);
        }
    }

    fn into_report(self, diffs: &[f64], p_value: f64, latency_budget_ms: u64) -> LineupReport {
        let boards = self.tricks.len();
        let avg_tricks = mean(&self.tricks);
        let avg_ms = if self.decisions == 0 {
            0.0
        } else {
            self.total_ms / self.decisions as f64
        };

        LineupReport {
            label: self.label,
            boards,
            avg_declarer_tricks: avg_tricks,
            ci95: confidence_interval(&self.tricks),
            make_rate: if boards == 0 {
                0.0
            } else {
                f64::from(self.made) / boards as f64
            },
            delta_vs_baseline: mean(diffs),
            p_value,
            average_ms_per_decision: avg_ms,
            over_budget: avg_ms > latency_budget_ms as f64,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LineupReport {
    pub label: String,
    pub boards: usize,
    pub avg_declarer_tricks: f64,
    pub ci95: (f64, f64),
    pub make_rate: f64,
    pub delta_vs_baseline: f64,
    pub p_value: f64,
    pub average_ms_per_decision: f64,
    pub over_budget: bool,
}

#[derive(Debug, Serialize)]
pub struct TournamentSummary {
    pub baseline: Option<String>,
    pub lineups: Vec<LineupReport>,
    pub latency_budget_ms: u64,
}

impl TournamentSummary {
    pub fn write_markdown(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let mut rows = String::new();
        rows.push_str("# Card Play Summary\n\n");
        if let Some(baseline) = &self.baseline {
            rows.push_str(&format!("Baseline lineup: {baseline}\n\n"));
        }
        rows.push_str(&format!(
            "Latency budget: {} ms average per decision\n\n",
            self.latency_budget_ms
        ));
        rows.push_str("| Lineup | Boards | Avg declarer tricks | Δ vs baseline | 95% CI | Make % | Avg ms/decision | Over Budget | p-value |\n");
        rows.push_str("|--------|--------|---------------------|----------------|--------|--------|------------------|-------------|---------|\n");

        for lineup in &self.lineups {
            rows.push_str(&format!(
                "| {label} | {boards} | {avg:.3} | {delta:+.3} | [{ci_low:.3}, {ci_high:.3}] | {made:.1}% | {latency:.2} | {over_budget} | {pval:.3} |\n",
                label = lineup.label,
                boards = lineup.boards,
                avg = lineup.avg_declarer_tricks,
                delta = lineup.delta_vs_baseline,
                ci_low = lineup.ci95.0,
                ci_high = lineup.ci95.1,
                made = lineup.make_rate * 100.0,
                latency = lineup.average_ms_per_decision,
                over_budget = if lineup.over_budget { "Yes" } else { "No" },
                pval = lineup.p_value,
            ));
        }

        fs::write(path.as_ref(), rows)
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn confidence_interval(points: &[f64]) -> (f64, f64) {
    if points.is_empty() {
        return (0.0, 0.0);
    }
    let mean = mean(points);
    if points.len() == 1 {
        return (mean, mean);
    }
    let variance = points
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / (points.len() as f64 - 1.0);
    let std_error = (variance / points.len() as f64).sqrt();
    let margin = CONFIDENCE_Z * std_error;
    (mean - margin, mean + margin)
}

/// Two-sided p-value of the paired differences, normal approximation with
/// tie correction. Zero differences are dropped.
fn wilcoxon_signed_rank(diffs: Vec<f64>) -> f64 {
    let mut paired: Vec<(f64, f64)> = diffs
        .into_iter()
        .filter(|d| d.abs() > f64::EPSILON)
        .map(|d| (d.abs(), d.signum()))
        .collect();
    let n = paired.len();
    if n == 0 {
        return 1.0;
    }
    paired.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut w_plus = 0.0;
    let mut w_minus = 0.0;
    let mut tie_adjustment = 0.0;
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && (paired[j + 1].0 - paired[i].0).abs() < 1e-12 {
            j += 1;
        }
        let rank = (i + j + 2) as f64 / 2.0;
        for (_, sign) in &paired[i..=j] {
            if *sign > 0.0 {
                w_plus += rank;
            } else {
                w_minus += rank;
            }
        }
        let ties = (j - i + 1) as f64;
        if ties > 1.0 {
            tie_adjustment += (ties.powi(3) - ties) / 48.0;
        }
        i = j + 1;
    }

    let n_f = n as f64;
    let mean_w = n_f * (n_f + 1.0) / 4.0;
    let variance_w = n_f * (n_f + 1.0) * (2.0 * n_f + 1.0) / 24.0 - tie_adjustment;
    if variance_w <= 0.0 {
        return 1.0;
    }

    let w = f64::min(w_plus, w_minus);
    let z = ((w - mean_w).abs() - 0.5).max(0.0) / variance_w.sqrt();
    match Normal::new(0.0, 1.0) {
        Ok(normal) => (2.0 * (1.0 - normal.cdf(z))).clamp(0.0, 1.0),
        Err(_) => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_interval_collapses_for_one_sample() {
        assert_eq!(confidence_interval(&[9.0]), (9.0, 9.0));
        assert_eq!(confidence_interval(&[]), (0.0, 0.0));
    }

    #[test]
    fn confidence_interval_brackets_the_mean() {
        let (low, high) = confidence_interval(&[8.0, 9.0, 10.0, 11.0]);
        assert!(low < 9.5 && high > 9.5);
        assert!((9.5 - low - (high - 9.5)).abs() < 1e-9);
    }

    #[test]
    fn identical_results_are_not_significant() {
        assert_eq!(wilcoxon_signed_rank(vec![0.0; 12]), 1.0);
    }

    #[test]
    fn consistent_improvement_is_significant() {
        let diffs = (1..=20).map(f64::from).collect();
        let p = wilcoxon_signed_rank(diffs);
        assert!(p < 0.01, "p = {p}");
    }

    #[test]
    fn mixed_signs_are_not_significant() {
        let diffs = vec![1.0, -1.0, 2.0, -2.0, 1.0, -1.0];
        assert!(wilcoxon_signed_rank(diffs) > 0.5);
    }
}
