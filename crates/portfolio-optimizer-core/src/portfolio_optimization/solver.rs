//! General constrained minimiser over long-only, fully-invested weights.
//!
//! Feasible set: `{ w : sum(w) = 1, 0 <= w_i <= 1 }` (the probability simplex),
//! optionally intersected with linear equalities `a' w = b`.
//!
//! - Inner loop: spectral projected gradient (Birgin, Martinez & Raydan).
//!   Every iterate is a convex combination of simplex points, so the budget
//!   and bound constraints hold at every step.
//! - Outer loop: augmented Lagrangian on the extra equalities. Multipliers are
//!   updated after each inner solve; the penalty grows tenfold whenever the
//!   violation fails to shrink by at least a quarter.
//!
//! All arithmetic uses `rust_decimal::Decimal`.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::PortfolioError;
use crate::portfolio::performance::vec_dot;
use crate::portfolio::WeightVector;
use crate::PortfolioResult;

const ARMIJO_SUFFICIENT_DECREASE: Decimal = dec!(0.0001);
const NONMONOTONE_WINDOW: usize = 10;
const MAX_BACKTRACKS: u32 = 60;
const INITIAL_STEP: Decimal = dec!(1);
const MIN_STEP: Decimal = dec!(0.0000000001);
const MAX_STEP: Decimal = dec!(1000);
const INITIAL_PENALTY: Decimal = dec!(10);
const MAX_PENALTY: Decimal = dec!(100000000);
/// Stationarity accepted when the line search can no longer make progress.
const STALL_TOLERANCE: Decimal = dec!(0.00000001);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A smooth objective over the weight vector.
pub trait ObjectiveFunction: Sync {
    /// Name used in logs and error messages.
    fn name(&self) -> &str;

    /// Objective at `w`; `None` where it is undefined.
    fn value(&self, w: &[Decimal]) -> Option<Decimal>;

    /// Gradient at `w`; `None` where it is undefined.
    fn gradient(&self, w: &[Decimal]) -> Option<Vec<Decimal>>;

    /// Value reported in [`SolverOutcome::objective_value`]. Defaults to
    /// [`value`](Self::value); objectives that minimise a monotone transform of
    /// the quantity of interest override it.
    fn reported_value(&self, w: &[Decimal]) -> Option<Decimal> {
        self.value(w)
    }
}

/// Linear equality `coefficients . w == target`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearEquality {
    pub coefficients: Vec<Decimal>,
    pub target: Decimal,
}

impl LinearEquality {
    pub fn residual(&self, w: &[Decimal]) -> Decimal {
        vec_dot(&self.coefficients, w) - self.target
    }
}

/// Iteration and tolerance budget for one solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Projected-gradient iterations per inner solve.
    pub max_iterations: u32,
    /// Augmented-Lagrangian multiplier updates (only used with equalities).
    pub max_outer_iterations: u32,
    /// Stationarity tolerance: the inner loop stops once
    /// `max_i |P(w - grad) - w|_i` falls below it.
    pub tolerance: Decimal,
    /// Maximum absolute residual accepted on each equality constraint.
    pub constraint_tolerance: Decimal,
    /// Wall-clock budget for the whole solve, in milliseconds.
    pub max_duration_ms: Option<u64>,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_iterations: 2000,
            max_outer_iterations: 30,
            tolerance: dec!(0.0000000001),
            constraint_tolerance: dec!(0.00000001),
            max_duration_ms: Some(10_000),
        }
    }
}

/// Solution of a converged solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverOutcome {
    pub weights: WeightVector,
    /// [`ObjectiveFunction::reported_value`] at the solution.
    pub objective_value: Decimal,
    /// Projected-gradient iterations across all inner solves.
    pub iterations: u32,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Minimise `objective` over `n` long-only weights summing to one, subject to
/// `equalities`, starting from the uniform vector.
///
/// Fails with [`PortfolioError::OptimizationNonconvergence`] when the budget
/// runs out, the deadline passes, the objective is undefined along the path,
/// or an equality is still violated beyond `constraint_tolerance`.
pub fn minimize(
    objective: &dyn ObjectiveFunction,
    equalities: &[LinearEquality],
    n: usize,
    settings: &SolverSettings,
) -> PortfolioResult<SolverOutcome> {
    if n == 0 {
        return Err(PortfolioError::InsufficientData(
            "At least one asset required".into(),
        ));
    }
    if let Some(eq) = equalities.iter().find(|eq| eq.coefficients.len() != n) {
        return Err(PortfolioError::invalid(
            "equalities",
            format!("Expected {} coefficients but got {}", n, eq.coefficients.len()),
        ));
    }

    let mut run = SolveRun {
        name: objective.name(),
        settings,
        deadline: settings
            .max_duration_ms
            .map(|ms| Instant::now() + Duration::from_millis(ms)),
        iterations: 0,
    };

    let mut w = WeightVector::uniform(n).into_inner();
    if objective.value(&w).is_none() {
        return Err(run.fail("objective is undefined at the uniform starting point"));
    }

    let mut multipliers = vec![Decimal::ZERO; equalities.len()];
    let mut penalty = INITIAL_PENALTY;
    let mut prev_violation: Option<Decimal> = None;
    let mut violation = Decimal::ZERO;

    for _ in 0..settings.max_outer_iterations.max(1) {
        let lagrangian = AugmentedLagrangian {
            objective,
            equalities,
            multipliers: &multipliers,
            penalty,
        };
        let (next, converged) = run.projected_gradient(&lagrangian, w)?;
        w = next;

        let residuals: Vec<Decimal> = equalities.iter().map(|eq| eq.residual(&w)).collect();
        violation = residuals
            .iter()
            .map(|r| r.abs())
            .max()
            .unwrap_or(Decimal::ZERO);

        if converged && violation <= settings.constraint_tolerance {
            return run.finish(objective, w);
        }
        if equalities.is_empty() {
            break;
        }

        for (lambda, r) in multipliers.iter_mut().zip(residuals.iter()) {
            *lambda += penalty * *r;
        }
        if prev_violation.map_or(false, |prev| violation > prev * dec!(0.25)) {
            penalty = (penalty * dec!(10)).min(MAX_PENALTY);
        }
        prev_violation = Some(violation);
    }

    let reason = if violation > settings.constraint_tolerance {
        format!(
            "constraint violation {} exceeds tolerance {}",
            violation, settings.constraint_tolerance
        )
    } else {
        "iteration limit reached".to_string()
    };
    warn!(
        "{} failed after {} iterations: {}",
        run.name, run.iterations, reason
    );
    Err(run.fail(&reason))
}

/// Euclidean projection onto `{ w : w >= 0, sum(w) = 1 }`.
pub fn project_simplex(v: &[Decimal]) -> Vec<Decimal> {
    if v.is_empty() {
        return Vec::new();
    }

    let mut u = v.to_vec();
    u.sort_by(|a, b| b.cmp(a));

    let mut cssv = Decimal::ZERO;
    let mut rho = 0usize;
    let mut theta = Decimal::ZERO;
    for (i, ui) in u.iter().enumerate() {
        cssv += *ui;
        let candidate = (cssv - Decimal::ONE) / Decimal::from((i + 1) as i64);
        if *ui - candidate > Decimal::ZERO {
            rho = i + 1;
            theta = candidate;
        }
    }

    if rho == 0 {
        return WeightVector::uniform(v.len()).into_inner();
    }

    v.iter()
        .map(|x| (*x - theta).max(Decimal::ZERO))
        .collect()
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

/// f(w) + sum_k lambda_k c_k(w) + (rho / 2) sum_k c_k(w)^2
struct AugmentedLagrangian<'a> {
    objective: &'a dyn ObjectiveFunction,
    equalities: &'a [LinearEquality],
    multipliers: &'a [Decimal],
    penalty: Decimal,
}

impl ObjectiveFunction for AugmentedLagrangian<'_> {
    fn name(&self) -> &str {
        self.objective.name()
    }

    fn value(&self, w: &[Decimal]) -> Option<Decimal> {
        let mut total = self.objective.value(w)?;
        for (eq, lambda) in self.equalities.iter().zip(self.multipliers.iter()) {
            let c = eq.residual(w);
            total += *lambda * c + self.penalty / dec!(2) * c * c;
        }
        Some(total)
    }

    fn gradient(&self, w: &[Decimal]) -> Option<Vec<Decimal>> {
        let mut grad = self.objective.gradient(w)?;
        for (eq, lambda) in self.equalities.iter().zip(self.multipliers.iter()) {
            let scale = *lambda + self.penalty * eq.residual(w);
            for (g, a) in grad.iter_mut().zip(eq.coefficients.iter()) {
                *g += scale * *a;
            }
        }
        Some(grad)
    }
}

struct SolveRun<'a> {
    name: &'a str,
    settings: &'a SolverSettings,
    deadline: Option<Instant>,
    iterations: u32,
}

impl SolveRun<'_> {
    fn fail(&self, reason: &str) -> PortfolioError {
        PortfolioError::OptimizationNonconvergence {
            objective: self.name.to_string(),
            iterations: self.iterations,
            reason: reason.to_string(),
        }
    }

    fn finish(
        &self,
        objective: &dyn ObjectiveFunction,
        w: Vec<Decimal>,
    ) -> PortfolioResult<SolverOutcome> {
        let objective_value = objective
            .reported_value(&w)
            .ok_or_else(|| self.fail("objective is undefined at the solution"))?;
        let weights = WeightVector::new(w).map_err(|e| self.fail(&e.to_string()))?;
        debug!(
            "{} converged in {} iterations, objective {}",
            self.name, self.iterations, objective_value
        );
        Ok(SolverOutcome {
            weights,
            objective_value,
            iterations: self.iterations,
        })
    }

    /// Spectral projected gradient (Barzilai-Borwein steps, nonmonotone
    /// Armijo search along the projected direction).
    ///
    /// Returns the final iterate and whether the stationarity test was met.
    fn projected_gradient(
        &mut self,
        f: &dyn ObjectiveFunction,
        mut w: Vec<Decimal>,
    ) -> PortfolioResult<(Vec<Decimal>, bool)> {
        let mut fw = f
            .value(&w)
            .ok_or_else(|| self.fail("objective is undefined at the current iterate"))?;
        let mut grad = f
            .gradient(&w)
            .ok_or_else(|| self.fail("gradient is undefined at the current iterate"))?;
        let mut history: VecDeque<Decimal> = VecDeque::with_capacity(NONMONOTONE_WINDOW);
        history.push_back(fw);
        let mut alpha = INITIAL_STEP;

        for _ in 0..self.settings.max_iterations {
            if let Some(deadline) = self.deadline {
                if Instant::now() > deadline {
                    let budget = self.settings.max_duration_ms.unwrap_or_default();
                    return Err(self.fail(&format!("wall-clock budget of {budget} ms exceeded")));
                }
            }

            if stationarity(&w, &grad) <= self.settings.tolerance {
                return Ok((w, true));
            }
            self.iterations += 1;

            let trial: Vec<Decimal> = w
                .iter()
                .zip(grad.iter())
                .map(|(wi, gi)| *wi - alpha * *gi)
                .collect();
            let direction: Vec<Decimal> = project_simplex(&trial)
                .iter()
                .zip(w.iter())
                .map(|(p, wi)| *p - *wi)
                .collect();
            // g'd < 0 unless w is already stationary
            let slope = vec_dot(&grad, &direction);
            let reference = history.iter().copied().max().unwrap_or(fw);

            let mut lambda = Decimal::ONE;
            let mut accepted: Option<(Vec<Decimal>, Decimal)> = None;
            for _ in 0..MAX_BACKTRACKS {
                let candidate: Vec<Decimal> = w
                    .iter()
                    .zip(direction.iter())
                    .map(|(wi, di)| *wi + lambda * *di)
                    .collect();
                if let Some(fc) = f.value(&candidate) {
                    if fc <= reference + ARMIJO_SUFFICIENT_DECREASE * lambda * slope {
                        accepted = Some((candidate, fc));
                        break;
                    }
                }
                lambda /= dec!(2);
            }

            // Line search exhausted: accept only a (nearly) stationary point.
            let Some((next, f_next)) = accepted else {
                let measure = stationarity(&w, &grad);
                if measure <= self.settings.tolerance.max(STALL_TOLERANCE) {
                    debug!("{}: line search stalled after {} iterations", self.name, self.iterations);
                    return Ok((w, true));
                }
                warn!(
                    "{}: line search stalled at stationarity {} after {} iterations",
                    self.name, measure, self.iterations
                );
                return Err(self.fail(&format!(
                    "line search stalled at a non-stationary point (stationarity {measure})"
                )));
            };
            let next_grad = f
                .gradient(&next)
                .ok_or_else(|| self.fail("gradient is undefined at the current iterate"))?;

            let s: Vec<Decimal> = next.iter().zip(w.iter()).map(|(a, b)| *a - *b).collect();
            let y: Vec<Decimal> = next_grad
                .iter()
                .zip(grad.iter())
                .map(|(a, b)| *a - *b)
                .collect();
            let sy = vec_dot(&s, &y);
            alpha = if sy <= Decimal::ZERO {
                MAX_STEP
            } else {
                (vec_dot(&s, &s) / sy).max(MIN_STEP).min(MAX_STEP)
            };

            w = next;
            fw = f_next;
            grad = next_grad;
            if history.len() == NONMONOTONE_WINDOW {
                history.pop_front();
            }
            history.push_back(fw);
        }

        let converged = stationarity(&w, &grad) <= self.settings.tolerance;
        Ok((w, converged))
    }
}

/// max_i |P(w - g) - w|_i, zero exactly at a constrained stationary point.
fn stationarity(w: &[Decimal], grad: &[Decimal]) -> Decimal {
    let trial: Vec<Decimal> = w.iter().zip(grad.iter()).map(|(wi, gi)| *wi - *gi).collect();
    project_simplex(&trial)
        .iter()
        .zip(w.iter())
        .map(|(p, wi)| (*p - *wi).abs())
        .max()
        .unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// sum_i (w_i - c_i)^2, minimised at the projection of c.
    struct DistanceTo(Vec<Decimal>);

    impl ObjectiveFunction for DistanceTo {
        fn name(&self) -> &str {
            "distance"
        }

        fn value(&self, w: &[Decimal]) -> Option<Decimal> {
            Some(
                w.iter()
                    .zip(self.0.iter())
                    .map(|(a, b)| (*a - *b) * (*a - *b))
                    .sum(),
            )
        }

        fn gradient(&self, w: &[Decimal]) -> Option<Vec<Decimal>> {
            Some(
                w.iter()
                    .zip(self.0.iter())
                    .map(|(a, b)| dec!(2) * (*a - *b))
                    .collect(),
            )
        }
    }

    struct Undefined;

    impl ObjectiveFunction for Undefined {
        fn name(&self) -> &str {
            "undefined"
        }

        fn value(&self, _w: &[Decimal]) -> Option<Decimal> {
            None
        }

        fn gradient(&self, _w: &[Decimal]) -> Option<Vec<Decimal>> {
            None
        }
    }

    fn assert_feasible(w: &[Decimal]) {
        let total: Decimal = w.iter().sum();
        assert!((total - Decimal::ONE).abs() < dec!(0.000001), "sum {}", total);
        for wi in w {
            assert!(*wi >= Decimal::ZERO && *wi <= Decimal::ONE, "weight {}", wi);
        }
    }

    #[test]
    fn test_project_simplex_interior_point_unchanged() {
        let v = vec![dec!(0.2), dec!(0.3), dec!(0.5)];
        assert_eq!(project_simplex(&v), v);
    }

    #[test]
    fn test_project_simplex_clips_negative() {
        let p = project_simplex(&[dec!(2), dec!(-1)]);
        assert_eq!(p, vec![dec!(1), dec!(0)]);
        let p = project_simplex(&[dec!(0.9), dec!(0.9), dec!(-5)]);
        assert_eq!(p, vec![dec!(0.5), dec!(0.5), dec!(0)]);
        assert_feasible(&project_simplex(&[dec!(10), dec!(3), dec!(-2), dec!(7)]));
    }

    #[test]
    fn test_minimize_projects_target_inside_simplex() {
        let f = DistanceTo(vec![dec!(0.7), dec!(0.3), dec!(0)]);
        let out = minimize(&f, &[], 3, &SolverSettings::default()).unwrap();
        let w = out.weights.as_slice();
        assert_feasible(w);
        assert!((w[0] - dec!(0.7)).abs() < dec!(0.00001));
        assert!((w[1] - dec!(0.3)).abs() < dec!(0.00001));
        assert!(out.objective_value < dec!(0.0000001));
    }

    #[test]
    fn test_minimize_with_equality_constraint() {
        // Closest point to (1/3, 1/3, 1/3) with w0 - w2 = 0.2.
        let f = DistanceTo(vec![dec!(1) / dec!(3); 3]);
        let eq = LinearEquality {
            coefficients: vec![dec!(1), dec!(0), dec!(-1)],
            target: dec!(0.2),
        };
        let out = minimize(&f, &[eq.clone()], 3, &SolverSettings::default()).unwrap();
        let w = out.weights.as_slice();
        assert_feasible(w);
        assert!(eq.residual(w).abs() <= dec!(0.00000001));
        assert!((w[0] - dec!(0.4333333333)).abs() < dec!(0.0001));
        assert!((w[1] - dec!(0.3333333333)).abs() < dec!(0.0001));
    }

    #[test]
    fn test_infeasible_equality_is_nonconvergence() {
        // w0 = 1.5 cannot hold on the simplex.
        let f = DistanceTo(vec![dec!(0.5), dec!(0.5)]);
        let eq = LinearEquality {
            coefficients: vec![dec!(1), dec!(0)],
            target: dec!(1.5),
        };
        let err = minimize(&f, &[eq], 2, &SolverSettings::default()).unwrap_err();
        assert!(err.is_nonconvergence(), "{err}");
    }

    #[test]
    fn test_undefined_objective_is_nonconvergence() {
        let err = minimize(&Undefined, &[], 2, &SolverSettings::default()).unwrap_err();
        assert!(err.is_nonconvergence());
    }

    /// -w0, undefined once w0 exceeds one half.
    struct Cliff;

    impl ObjectiveFunction for Cliff {
        fn name(&self) -> &str {
            "cliff"
        }

        fn value(&self, w: &[Decimal]) -> Option<Decimal> {
            (w[0] <= dec!(0.5)).then(|| -w[0])
        }

        fn gradient(&self, w: &[Decimal]) -> Option<Vec<Decimal>> {
            (w[0] <= dec!(0.5)).then(|| vec![dec!(-1), Decimal::ZERO])
        }
    }

    #[test]
    fn test_stalled_line_search_is_nonconvergence() {
        // Every step away from (0.5, 0.5) is undefined, yet the point is far
        // from stationary.
        let err = minimize(&Cliff, &[], 2, &SolverSettings::default()).unwrap_err();
        match err {
            PortfolioError::OptimizationNonconvergence { reason, .. } => {
                assert!(reason.contains("line search stalled"), "{reason}");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_iteration_budget_exhausted() {
        let f = DistanceTo(vec![dec!(0.9), dec!(0.1)]);
        let settings = SolverSettings {
            max_iterations: 1,
            tolerance: Decimal::ZERO,
            ..SolverSettings::default()
        };
        let err = minimize(&f, &[], 2, &settings).unwrap_err();
        match err {
            PortfolioError::OptimizationNonconvergence {
                iterations, reason, ..
            } => {
                assert_eq!(iterations, 1);
                assert!(reason.contains("iteration limit"));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_zero_assets_rejected() {
        let f = DistanceTo(vec![]);
        assert!(minimize(&f, &[], 0, &SolverSettings::default()).is_err());
    }
}
