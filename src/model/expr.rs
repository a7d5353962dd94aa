//! Affine and quadratic expressions
//!
//! Term maps are insertion-ordered (`IndexMap`): slack numbering, penalty
//! folding, and `c`-vector assembly all depend on a stable, reproducible term
//! order, so a hash-randomised container is never acceptable here.

use std::fmt;

use indexmap::IndexMap;

use crate::{model::variable::VariableId, num::Scalar};

/// Affine expression `k + Σ cᵢ xᵢ`.
///
/// Absent keys have coefficient zero; `add_term` accumulates into existing
/// entries.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearExpr<T> {
    constant: T,
    terms: IndexMap<VariableId, T>,
}

impl<T: Scalar> LinearExpr<T> {
    /// The zero expression.
    pub fn new() -> Self {
        Self::constant(T::zero())
    }

    /// A constant expression with no variable terms.
    pub fn constant(constant: T) -> Self {
        Self {
            constant,
            terms: IndexMap::new(),
        }
    }

    /// Builder form of [`LinearExpr::add_term`].
    pub fn with_term(mut self, variable: VariableId, coefficient: T) -> Self {
        self.add_term(variable, coefficient);
        self
    }

    /// Add `coefficient * variable`, accumulating into any existing term.
    pub fn add_term(&mut self, variable: VariableId, coefficient: T) {
        *self.terms.entry(variable).or_insert_with(T::zero) += coefficient;
    }

    /// The coefficient of `variable` (zero when absent).
    pub fn coefficient(&self, variable: VariableId) -> T {
        self.terms.get(&variable).copied().unwrap_or_else(T::zero)
    }

    /// The constant term `k`.
    pub fn constant_term(&self) -> T {
        self.constant
    }

    /// Replace the constant term.
    pub fn set_constant(&mut self, constant: T) {
        self.constant = constant;
    }

    /// Iterate `(variable, coefficient)` pairs in insertion order.
    pub fn terms(&self) -> impl Iterator<Item = (VariableId, T)> + '_ {
        self.terms.iter().map(|(&v, &c)| (v, c))
    }

    /// Number of variable terms (including explicit zeros).
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Whether the expression has no variable terms.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Multiply the whole expression (constant included) by `factor`.
    pub fn scale(&mut self, factor: T) {
        self.constant *= factor;

        for coefficient in self.terms.values_mut() {
            *coefficient *= factor;
        }
    }

    /// Divide the whole expression (constant included) by `divisor`.
    pub fn divide(&mut self, divisor: T) {
        self.constant /= divisor;

        for coefficient in self.terms.values_mut() {
            *coefficient /= divisor;
        }
    }

    /// Evaluate at the assignment `values`, indexed by variable position.
    pub fn evaluate(&self, values: &[T]) -> T {
        self.terms()
            .fold(self.constant, |acc, (variable, coefficient)| {
                acc + coefficient * values[variable.position()]
            })
    }
}

impl<T: Scalar> Default for LinearExpr<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar> fmt::Display for LinearExpr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;

        for (variable, coefficient) in self.terms() {
            if first {
                write!(f, "{coefficient} {variable}")?;
                first = false;
            } else if coefficient < T::zero() {
                write!(f, " - {} {variable}", coefficient.abs())?;
            } else {
                write!(f, " + {coefficient} {variable}")?;
            }
        }

        if first {
            write!(f, "{}", self.constant)
        } else if self.constant.is_zero() {
            Ok(())
        } else if self.constant < T::zero() {
            write!(f, " - {}", self.constant.abs())
        } else {
            write!(f, " + {}", self.constant)
        }
    }
}

/// Unordered variable pair `{i, j}`; `i = j` is permitted and marks a square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarPair {
    lo: VariableId,
    hi: VariableId,
}

impl VarPair {
    /// Build the pair, normalising the order so `{i, j}` and `{j, i}` compare
    /// equal.
    pub fn new(a: VariableId, b: VariableId) -> Self {
        if a <= b {
            Self { lo: a, hi: b }
        } else {
            Self { lo: b, hi: a }
        }
    }

    /// The smaller variable of the pair.
    pub fn lower(self) -> VariableId {
        self.lo
    }

    /// The larger variable of the pair.
    pub fn upper(self) -> VariableId {
        self.hi
    }

    /// Whether both members are the same variable.
    pub fn is_diagonal(self) -> bool {
        self.lo == self.hi
    }
}

/// Quadratic expression: an affine part plus unordered-pair terms.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadExpr<T> {
    linear: LinearExpr<T>,
    quadratic: IndexMap<VarPair, T>,
}

impl<T: Scalar> QuadExpr<T> {
    /// The zero expression.
    pub fn new() -> Self {
        Self::from_linear(LinearExpr::new())
    }

    /// Wrap an affine expression with no quadratic terms.
    pub fn from_linear(linear: LinearExpr<T>) -> Self {
        Self {
            linear,
            quadratic: IndexMap::new(),
        }
    }

    /// The affine part.
    pub fn linear(&self) -> &LinearExpr<T> {
        &self.linear
    }

    /// Mutable access to the affine part.
    pub fn linear_mut(&mut self) -> &mut LinearExpr<T> {
        &mut self.linear
    }

    /// Add `coefficient * x_i x_j`, accumulating into any existing term.
    pub fn add_quadratic_term(&mut self, pair: VarPair, coefficient: T) {
        *self.quadratic.entry(pair).or_insert_with(T::zero) += coefficient;
    }

    /// Iterate `(pair, coefficient)` in insertion order.
    pub fn quadratic_terms(&self) -> impl Iterator<Item = (VarPair, T)> + '_ {
        self.quadratic.iter().map(|(&p, &c)| (p, c))
    }

    /// Whether any quadratic term is present.
    pub fn has_quadratic_terms(&self) -> bool {
        !self.quadratic.is_empty()
    }

    /// Accumulate `weight * f(x)²` into this expression.
    ///
    /// Expands `(k + Σ cᵢ xᵢ)²` into its constant, linear, and pair terms in
    /// the term order of `f`, so repeated folds stay deterministic.
    pub fn add_scaled_square(&mut self, f: &LinearExpr<T>, weight: T) {
        let two = T::one() + T::one();
        let k = f.constant_term();

        self.linear.set_constant(self.linear.constant_term() + weight * k * k);

        let terms: Vec<(VariableId, T)> = f.terms().collect();

        for &(variable, coefficient) in &terms {
            self.linear.add_term(variable, weight * two * k * coefficient);
        }

        for (i, &(var_a, coef_a)) in terms.iter().enumerate() {
            for (j, &(var_b, coef_b)) in terms.iter().enumerate().skip(i) {
                let coefficient = if i == j {
                    weight * coef_a * coef_a
                } else {
                    weight * two * coef_a * coef_b
                };

                self.add_quadratic_term(VarPair::new(var_a, var_b), coefficient);
            }
        }
    }

    /// Evaluate at the assignment `values`, indexed by variable position.
    pub fn evaluate(&self, values: &[T]) -> T {
        self.quadratic_terms()
            .fold(self.linear.evaluate(values), |acc, (pair, coefficient)| {
                acc + coefficient
                    * values[pair.lower().position()]
                    * values[pair.upper().position()]
            })
    }
}

impl<T: Scalar> Default for QuadExpr<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use crate::num::Scalar;

    use super::*;

    fn var(position: usize) -> VariableId {
        VariableId::from_position(position)
    }

    #[test]
    fn add_term_accumulates_coefficients() {
        let mut expr = LinearExpr::new();
        expr.add_term(var(0), 2.0);
        expr.add_term(var(0), 3.0);

        assert_eq!(expr.coefficient(var(0)), 5.0);
        assert_eq!(expr.len(), 1);
    }

    #[test]
    fn terms_iterate_in_insertion_order() {
        let mut expr = LinearExpr::new();
        expr.add_term(var(2), 1.0);
        expr.add_term(var(0), 2.0);
        expr.add_term(var(1), 3.0);

        let order: Vec<usize> = expr.terms().map(|(v, _)| v.index()).collect();

        assert_eq!(order, [3, 1, 2]);
    }

    #[test]
    fn divide_rescales_constant_and_coefficients() {
        let mut expr = LinearExpr::constant(9.0).with_term(var(0), 3.0);
        expr.divide(3.0);

        assert_eq!(expr.constant_term(), 3.0);
        assert_eq!(expr.coefficient(var(0)), 1.0);
    }

    #[test]
    fn display_folds_signs_into_operators() {
        let expr = LinearExpr::constant(-1.0)
            .with_term(var(0), 2.0)
            .with_term(var(1), -0.5);

        assert_eq!(expr.to_string(), "2 x1 - 0.5 x2 - 1");
    }

    #[test]
    fn var_pair_is_unordered() {
        assert_eq!(VarPair::new(var(0), var(1)), VarPair::new(var(1), var(0)));
        assert!(VarPair::new(var(2), var(2)).is_diagonal());
    }

    #[test]
    fn scaled_square_expands_binomial() {
        // 2 * (2x + 3)^2 = 8x^2 + 24x + 18
        let f = LinearExpr::constant(3.0).with_term(var(0), 2.0);

        let mut quad = QuadExpr::new();
        quad.add_scaled_square(&f, 2.0);

        assert_eq!(quad.linear().constant_term(), 18.0);
        assert_eq!(quad.linear().coefficient(var(0)), 24.0);

        let (pair, coefficient) = quad.quadratic_terms().next().unwrap();
        assert!(pair.is_diagonal());
        assert_eq!(coefficient, 8.0);
    }

    #[test]
    fn scaled_square_emits_cross_terms_once() {
        // (x + y - 1)^2 = x^2 + y^2 + 2xy - 2x - 2y + 1
        let f = LinearExpr::constant(-1.0)
            .with_term(var(0), 1.0)
            .with_term(var(1), 1.0);

        let mut quad = QuadExpr::new();
        quad.add_scaled_square(&f, 1.0);

        assert_eq!(quad.linear().constant_term(), 1.0);
        assert_eq!(quad.linear().coefficient(var(0)), -2.0);
        assert_eq!(quad.linear().coefficient(var(1)), -2.0);

        let terms: Vec<(VarPair, f64)> = quad.quadratic_terms().collect();
        assert_eq!(terms.len(), 3);
        assert_eq!(terms[0], (VarPair::new(var(0), var(0)), 1.0));
        assert_eq!(terms[1], (VarPair::new(var(0), var(1)), 2.0));
        assert_eq!(terms[2], (VarPair::new(var(1), var(1)), 1.0));
    }

    #[test]
    fn quadratic_evaluation_matches_expansion() {
        let f = LinearExpr::constant(-1.0)
            .with_term(var(0), 1.0)
            .with_term(var(1), 2.0);

        let mut quad = QuadExpr::new();
        quad.add_scaled_square(&f, 1.0);

        // f(0.5, 1.0) = 0.5 + 2 - 1 = 1.5, squared = 2.25
        assert!(quad.evaluate(&[0.5, 1.0]).approx_eq(2.25));
    }
}
