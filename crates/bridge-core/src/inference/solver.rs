//! Maximum-weight assignment search over a [`WeightedCsp`].

use crate::inference::csp::{Value, VarId, WeightedCsp};
use std::collections::{BTreeMap, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolverOptions {
    /// Run arc consistency once before searching.
    pub ac3: bool,
    /// Branch on the variable with the fewest viable values first instead
    /// of declaration order.
    pub mcv: bool,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            ac3: true,
            mcv: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Partial-assignment extensions tried.
    pub operations: usize,
    /// Complete assignments with positive weight reached.
    pub assignments: usize,
    /// Values removed by node and arc consistency.
    pub pruned: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    values: BTreeMap<String, Value>,
    weight: f64,
}

impl Assignment {
    pub fn get(&self, name: &str) -> Option<Value> {
        self.values.get(name).copied()
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), *value))
    }
}

/// Outcome of a solve. `Unsolved` means no total assignment has positive
/// weight; it is distinct from solving a problem with no variables.
#[derive(Debug, Clone, PartialEq)]
pub enum Solution {
    Solved(Assignment),
    Unsolved,
}

impl Solution {
    pub fn assignment(&self) -> Option<&Assignment> {
        match self {
            Solution::Solved(assignment) => Some(assignment),
            Solution::Unsolved => None,
        }
    }

    pub fn is_solved(&self) -> bool {
        matches!(self, Solution::Solved(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConstraintSolver {
    options: SolverOptions,
    stats: SearchStats,
}

impl ConstraintSolver {
    pub fn new(options: SolverOptions) -> Self {
        Self {
            options,
            stats: SearchStats::default(),
        }
    }

    pub fn options(&self) -> SolverOptions {
        self.options
    }

    /// Counters from the most recent [`ConstraintSolver::solve`].
    pub fn stats(&self) -> SearchStats {
        self.stats
    }

    /// Finds a total assignment of maximum weight. Among equal weights the
    /// first one reached in search order is kept.
    pub fn solve(&mut self, csp: &WeightedCsp) -> Solution {
        self.stats = SearchStats::default();
        let mut domains: Vec<Vec<usize>> = csp
            .variables()
            .iter()
            .map(|variable| (0..variable.domain().len()).collect())
            .collect();

        if self.options.ac3 && !self.enforce_consistency(csp, &mut domains) {
            tracing::debug!(
                target: "bridge_core::inference",
                pruned = self.stats.pruned,
                "arc consistency emptied a domain"
            );
            return Solution::Unsolved;
        }

        let mut search = Search {
            csp,
            domains: &domains,
            mcv: self.options.mcv,
            positions: vec![None; csp.len()],
            best: None,
            stats: &mut self.stats,
        };
        search.backtrack(0, 1.0);

        match search.best.take() {
            Some((positions, weight)) => {
                let values = csp
                    .variables()
                    .iter()
                    .zip(positions)
                    .map(|(variable, position)| {
                        (variable.name().to_string(), variable.domain()[position])
                    })
                    .collect();
                Solution::Solved(Assignment { values, weight })
            }
            None => Solution::Unsolved,
        }
    }

    /// Node consistency followed by AC-3. Returns false when a domain
    /// empties.
    fn enforce_consistency(&mut self, csp: &WeightedCsp, domains: &mut [Vec<usize>]) -> bool {
        for (variable, domain) in csp.variables().iter().zip(domains.iter_mut()) {
            let before = domain.len();
            domain.retain(|position| variable.unary_weights()[*position] > 0.0);
            self.stats.pruned += before - domain.len();
        }

        let mut queue: VecDeque<(VarId, VarId)> = (0..csp.len())
            .flat_map(|x| csp.neighbors(x).iter().map(move |y| (x, *y)))
            .collect();

        while let Some((x, y)) = queue.pop_front() {
            if self.revise(csp, domains, x, y) {
                if domains[x].is_empty() {
                    return false;
                }
                for z in csp.neighbors(x) {
                    if *z != y {
                        queue.push_back((*z, x));
                    }
                }
            }
        }
        domains.iter().all(|domain| !domain.is_empty())
    }

    /// Drops values of `x` that weigh zero against every remaining value
    /// of `y`.
    fn revise(&mut self, csp: &WeightedCsp, domains: &mut [Vec<usize>], x: VarId, y: VarId) -> bool {
        let Some(table) = csp.pair_table(x, y) else {
            return false;
        };
        let y_unary = csp.variables()[y].unary_weights();
        let y_domain = domains[y].clone();
        let before = domains[x].len();
        domains[x].retain(|vx| {
            y_domain
                .iter()
                .any(|vy| table[*vx][*vy] * y_unary[*vy] > 0.0)
        });
        let removed = before - domains[x].len();
        self.stats.pruned += removed;
        removed > 0
    }
}

struct Search<'a> {
    csp: &'a WeightedCsp,
    domains: &'a [Vec<usize>],
    mcv: bool,
    positions: Vec<Option<usize>>,
    best: Option<(Vec<usize>, f64)>,
    stats: &'a mut SearchStats,
}

impl Search<'_> {
    fn backtrack(&mut self, assigned: usize, weight: f64) {
        if assigned == self.csp.len() {
            self.stats.assignments += 1;
            let improves = self.best.as_ref().is_none_or(|(_, best)| weight > *best);
            if improves {
                let positions = self.positions.iter().map(|p| p.unwrap_or(0)).collect();
                self.best = Some((positions, weight));
            }
            return;
        }

        let Some(var) = self.next_variable() else {
            return;
        };
        let domains = self.domains;
        for position in domains[var].iter().copied() {
            self.stats.operations += 1;
            let delta = self.delta_weight(var, position);
            if delta == 0.0 {
                continue;
            }
            self.positions[var] = Some(position);
            self.backtrack(assigned + 1, weight * delta);
            self.positions[var] = None;
        }
    }

    /// Weight contributed by giving `var` the value at `position`, given
    /// the variables assigned so far.
    fn delta_weight(&self, var: VarId, position: usize) -> f64 {
        let mut weight = self.csp.variables()[var].unary_weights()[position];
        for neighbor in self.csp.neighbors(var) {
            if weight == 0.0 {
                break;
            }
            let (Some(other), Some(table)) =
                (self.positions[*neighbor], self.csp.pair_table(var, *neighbor))
            else {
                continue;
            };
            weight *= table[position][other];
        }
        weight
    }

    fn next_variable(&self) -> Option<VarId> {
        let mut unassigned = (0..self.csp.len()).filter(|id| self.positions[*id].is_none());
        if !self.mcv {
            return unassigned.next();
        }
        unassigned.min_by_key(|id| {
            self.domains[*id]
                .iter()
                .filter(|position| self.delta_weight(*id, **position) > 0.0)
                .count()
        })
    }
}
