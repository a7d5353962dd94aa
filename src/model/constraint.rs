//! Constraints and their admissible-value sets

use slotmap::new_key_type;

use crate::model::expr::LinearExpr;

new_key_type! {
    /// Stable handle to a constraint in a [`Model`](crate::model::Model).
    pub struct ConstraintKey;
}

/// The set a constraint function is required to lie in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstraintSet<T> {
    /// `f(x) ≥ lower`
    GreaterThan(T),

    /// `f(x) ≤ upper`
    LessThan(T),

    /// `f(x) = value`
    EqualTo(T),

    /// `lower ≤ f(x) ≤ upper`; requires `lower ≤ upper`.
    Interval(T, T),

    /// `f(x) ∈ {0} ∪ ([lower, upper] ∩ ℤ)`. Accepted by the data model so it
    /// can be rejected with a typed error; no transform supports it.
    Semiinteger(T, T),

    /// `f(x) ∈ {0} ∪ [lower, upper]`. Accepted by the data model so it can be
    /// rejected with a typed error; no transform supports it.
    Semicontinuous(T, T),
}

impl<T> ConstraintSet<T> {
    /// The set's kind, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GreaterThan(_) => "GreaterThan",
            Self::LessThan(_) => "LessThan",
            Self::EqualTo(_) => "EqualTo",
            Self::Interval(_, _) => "Interval",
            Self::Semiinteger(_, _) => "Semiinteger",
            Self::Semicontinuous(_, _) => "Semicontinuous",
        }
    }
}

/// A named scalar constraint `(func, set)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint<T> {
    name: String,
    func: LinearExpr<T>,
    set: ConstraintSet<T>,
}

impl<T> Constraint<T> {
    /// Create a named constraint.
    pub fn new(name: impl Into<String>, func: LinearExpr<T>, set: ConstraintSet<T>) -> Self {
        Self {
            name: name.into(),
            func,
            set,
        }
    }

    /// The constraint name. Transforms preserve it across delete + re-add.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The affine function.
    pub fn func(&self) -> &LinearExpr<T> {
        &self.func
    }

    /// The admissible-value set.
    pub fn set(&self) -> &ConstraintSet<T> {
        &self.set
    }
}
