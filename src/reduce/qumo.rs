//! QUMO extraction
//!
//! Lowers an unconstrained quadratic model to the canonical
//! `½ xᵀ Q x + cᵀ x + k` tuple. Binary squares are linear (`x² = x`) and fold
//! into `c`; every other quadratic term is emitted as a symmetric pair of
//! coordinate triples, so continuous diagonals carry `2q` and the `½` factor
//! recovers the original `q x²`.

use indexmap::IndexMap;
use sprs::TriMat;

use crate::{
    model::{Model, Variable},
    num::Scalar,
};

/// A Quadratic Unconstrained Mixed Optimization instance.
///
/// The objective reads `½ xᵀ Q x + cᵀ x + k`, where the variables listed in
/// `binaries` take values in `{0, 1}` and the rest lie in `[0, 1]`. All
/// coordinates are 0-based positions into the model's variable order.
#[derive(Debug)]
pub struct Qumo<T> {
    /// Symmetric quadratic coefficients as coordinate triples, duplicates
    /// summed.
    pub q: TriMat<T>,

    /// Dense linear coefficients, one per variable.
    pub c: Vec<T>,

    /// Constant offset.
    pub k: T,

    /// Sorted positions of the binary variables.
    pub binaries: Vec<usize>,

    /// Variable display names, in variable order.
    pub names: Vec<String>,
}

impl<T: Clone> Clone for Qumo<T> {
    fn clone(&self) -> Self {
        Self {
            q: TriMat::from_triplets(
                (self.q.rows(), self.q.cols()),
                self.q.row_inds().to_vec(),
                self.q.col_inds().to_vec(),
                self.q.data().to_vec(),
            ),
            c: self.c.clone(),
            k: self.k.clone(),
            binaries: self.binaries.clone(),
            names: self.names.clone(),
        }
    }
}

impl<T: Scalar> Qumo<T> {
    /// Evaluate `½ xᵀ Q x + cᵀ x + k` at the assignment `values`.
    pub fn evaluate(&self, values: &[T]) -> T {
        let two = T::one() + T::one();

        let quadratic = self
            .q
            .triplet_iter()
            .fold(T::zero(), |acc, (&coefficient, (i, j))| {
                acc + coefficient * values[i] * values[j]
            });

        let linear = self
            .c
            .iter()
            .zip(values)
            .fold(T::zero(), |acc, (&coefficient, &value)| {
                acc + coefficient * value
            });

        quadratic / two + linear + self.k
    }
}

/// Extract the QUMO tuple from an unconstrained quadratic model.
///
/// # Panics
///
/// Panics if the objective references variables outside the model's table;
/// constraints still present are a pipeline bug and are rejected in debug
/// builds.
pub fn extract_qumo<T: Scalar>(model: &Model<T>) -> Qumo<T> {
    debug_assert_eq!(
        model.num_constraints(),
        0,
        "extraction expects an unconstrained model"
    );

    let n = model.num_variables();
    let objective = model.objective();

    let mut c = vec![T::zero(); n];

    for (variable, coefficient) in objective.linear().terms() {
        c[variable.position()] += coefficient;
    }

    let binaries: Vec<usize> = model
        .variables()
        .filter(|(_, variable)| variable.is_binary())
        .map(|(id, _)| id.position())
        .collect();

    let mut triples: IndexMap<(usize, usize), T> = IndexMap::new();

    for (pair, coefficient) in objective.quadratic_terms() {
        let i = pair.lower().position();
        let j = pair.upper().position();

        let binary_square = pair.is_diagonal()
            && model
                .variable(pair.lower())
                .is_some_and(Variable::is_binary);

        if binary_square {
            c[i] += coefficient;
        } else {
            *triples.entry((i, j)).or_insert_with(T::zero) += coefficient;
            *triples.entry((j, i)).or_insert_with(T::zero) += coefficient;
        }
    }

    let mut q = TriMat::new((n, n));

    for ((i, j), coefficient) in triples {
        q.add_triplet(i, j, coefficient);
    }

    Qumo {
        q,
        c,
        k: objective.linear().constant_term(),
        binaries,
        names: model
            .variables()
            .map(|(_, variable)| variable.name().to_string())
            .collect(),
    }
}
