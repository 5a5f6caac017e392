//! Weighted constraint-satisfaction problems over small integer domains.
//!
//! Factors are data, not closures: each is evaluated over the domains of the
//! variables it touches when it is added, and the resulting weight table is
//! multiplied into whatever the variable (or pair) already carries. A
//! variable's weight for a value is therefore the product of every factor
//! registered against it.

use crate::inference::stats::hypergeometric;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

pub type Value = i32;
pub type VarId = usize;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CspError {
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),
    #[error("variable '{0}' declared twice")]
    DuplicateVariable(String),
    #[error("binary factor links '{0}' to itself")]
    SelfLoop(String),
}

/// Weight of a single value.
#[derive(Debug, Clone, PartialEq)]
pub enum UnaryFactor {
    /// Chance of drawing exactly `value` marked items in `draws` draws from
    /// `population` items of which `marked` are marked.
    Hypergeometric {
        population: u32,
        marked: u32,
        draws: u32,
    },
    /// 1 at `value`, 0 elsewhere.
    Pin(Value),
    /// 1 inside `min..=max`, 0 elsewhere.
    Range { min: Value, max: Value },
    /// Explicit weights; values missing from the table weigh `default`.
    Table {
        weights: BTreeMap<Value, f64>,
        default: f64,
    },
}

impl UnaryFactor {
    pub fn weight(&self, value: Value) -> f64 {
        match self {
            UnaryFactor::Hypergeometric {
                population,
                marked,
                draws,
            } => hypergeometric(
                i64::from(*population),
                i64::from(*marked),
                i64::from(*draws),
                i64::from(value),
            ),
            UnaryFactor::Pin(pinned) => indicator(value == *pinned),
            UnaryFactor::Range { min, max } => indicator((*min..=*max).contains(&value)),
            UnaryFactor::Table { weights, default } => {
                weights.get(&value).copied().unwrap_or(*default)
            }
        }
    }
}

/// Weight of a value pair `(a, b)` for the variables passed to
/// [`WeightedCsp::add_binary_factor`] in that order.
#[derive(Debug, Clone, PartialEq)]
pub enum BinaryFactor {
    /// Chance that `a` of the `b` items drawn are marked, drawing from a
    /// group of `population` items with `marked` marked ones. Zero when
    /// `a > b`.
    ConditionalHypergeometric { population: u32, marked: u32 },
    /// `a * (counts[b] + smoothing)`, `counts` defaulting to zero. `a` is
    /// a 0/1 flag that switches the evidence on.
    Evidence {
        counts: BTreeMap<Value, f64>,
        smoothing: f64,
    },
    /// 1 when `b` is zero, whatever `a` is. Records that a seat is void.
    ShownOut,
    Table {
        weights: BTreeMap<(Value, Value), f64>,
        default: f64,
    },
}

impl BinaryFactor {
    pub fn weight(&self, a: Value, b: Value) -> f64 {
        match self {
            BinaryFactor::ConditionalHypergeometric { population, marked } => {
                if a > b {
                    return 0.0;
                }
                hypergeometric(
                    i64::from(*population),
                    i64::from(*marked),
                    i64::from(b),
                    i64::from(a),
                )
            }
            BinaryFactor::Evidence { counts, smoothing } => {
                f64::from(a) * (counts.get(&b).copied().unwrap_or(0.0) + smoothing)
            }
            BinaryFactor::ShownOut => indicator(b == 0),
            BinaryFactor::Table { weights, default } => {
                weights.get(&(a, b)).copied().unwrap_or(*default)
            }
        }
    }
}

fn indicator(holds: bool) -> f64 {
    if holds { 1.0 } else { 0.0 }
}

#[derive(Debug, Clone)]
pub struct Variable {
    name: String,
    domain: Vec<Value>,
    unary: Vec<f64>,
}

impl Variable {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn domain(&self) -> &[Value] {
        &self.domain
    }

    /// Product of the unary factors for each domain position.
    pub fn unary_weights(&self) -> &[f64] {
        &self.unary
    }
}

/// Weight table of a variable pair, indexed by domain positions
/// `[first][second]`.
pub type PairTable = Vec<Vec<f64>>;

#[derive(Debug, Clone, Default)]
pub struct WeightedCsp {
    variables: Vec<Variable>,
    index: HashMap<String, VarId>,
    binary: HashMap<(VarId, VarId), PairTable>,
    neighbors: Vec<Vec<VarId>>,
}

impl WeightedCsp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_variable(
        &mut self,
        name: impl Into<String>,
        domain: impl IntoIterator<Item = Value>,
    ) -> Result<VarId, CspError> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(CspError::DuplicateVariable(name));
        }
        let domain: Vec<Value> = domain.into_iter().collect();
        let id = self.variables.len();
        self.variables.push(Variable {
            name: name.clone(),
            unary: vec![1.0; domain.len()],
            domain,
        });
        self.neighbors.push(Vec::new());
        self.index.insert(name, id);
        Ok(id)
    }

    pub fn add_unary_factor(&mut self, name: &str, factor: &UnaryFactor) -> Result<(), CspError> {
        let id = self.id(name)?;
        let variable = &mut self.variables[id];
        for (weight, value) in variable.unary.iter_mut().zip(&variable.domain) {
            *weight *= factor.weight(*value);
        }
        Ok(())
    }

    pub fn add_binary_factor(
        &mut self,
        first: &str,
        second: &str,
        factor: &BinaryFactor,
    ) -> Result<(), CspError> {
        let a = self.id(first)?;
        let b = self.id(second)?;
        if a == b {
            return Err(CspError::SelfLoop(first.to_string()));
        }

        let a_domain = &self.variables[a].domain;
        let b_domain = &self.variables[b].domain;
        let forward: PairTable = a_domain
            .iter()
            .map(|va| b_domain.iter().map(|vb| factor.weight(*va, *vb)).collect())
            .collect();
        let backward: PairTable = (0..b_domain.len())
            .map(|j| forward.iter().map(|row| row[j]).collect())
            .collect();

        self.merge_table(a, b, forward);
        self.merge_table(b, a, backward);
        Ok(())
    }

    fn merge_table(&mut self, from: VarId, to: VarId, table: PairTable) {
        match self.binary.get_mut(&(from, to)) {
            Some(existing) => {
                for (row, new_row) in existing.iter_mut().zip(table) {
                    for (weight, factor) in row.iter_mut().zip(new_row) {
                        *weight *= factor;
                    }
                }
            }
            None => {
                self.binary.insert((from, to), table);
                self.neighbors[from].push(to);
            }
        }
    }

    pub fn id(&self, name: &str) -> Result<VarId, CspError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| CspError::UnknownVariable(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.index.get(name).map(|id| &self.variables[*id])
    }

    pub fn neighbors(&self, id: VarId) -> &[VarId] {
        &self.neighbors[id]
    }

    /// The combined binary table for `(from, to)`, `None` when the pair
    /// shares no factor.
    pub fn pair_table(&self, from: VarId, to: VarId) -> Option<&PairTable> {
        self.binary.get(&(from, to))
    }

    /// Convenience lookup of a combined binary weight by names and values.
    pub fn binary_weight(&self, first: &str, a: Value, second: &str, b: Value) -> Option<f64> {
        let from = *self.index.get(first)?;
        let to = *self.index.get(second)?;
        let i = self.variables[from].domain.iter().position(|v| *v == a)?;
        let j = self.variables[to].domain.iter().position(|v| *v == b)?;
        self.binary.get(&(from, to)).map(|table| table[i][j])
    }

    /// Weight of a total assignment given as one domain position per
    /// variable: the product of every unary and binary factor.
    pub fn weight_of(&self, positions: &[usize]) -> f64 {
        let mut weight = 1.0;
        for (id, variable) in self.variables.iter().enumerate() {
            weight *= variable.unary[positions[id]];
        }
        for ((from, to), table) in &self.binary {
            if from < to {
                weight *= table[positions[*from]][positions[*to]];
            }
        }
        weight
    }
}
