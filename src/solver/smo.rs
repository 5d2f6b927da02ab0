//! Sequential Minimal Optimization (SMO) solver
//!
//! Solves the SVM dual
//!
//! ```text
//! min_α  ½ αᵀQα + pᵀα
//! s.t.   yᵀα = Δ,  0 ≤ α_t ≤ C_t
//! ```
//!
//! two variables at a time, picking the pair by the maximal violating pair
//! rule with second order information (Fan, Chen and Lin, JMLR 2005). The
//! ν formulations carry one more linear equality; `SolverVariant::Nu`
//! switches working-set selection and ρ recovery to respect it while the
//! update step and the loop stay shared.

use crate::solver::qmatrix::QMatrix;
use log::{debug, warn};

/// Curvature floor substituted when the pair's quadratic coefficient is not positive
pub const TAU: f64 = 1e-12;

const INF: f64 = f64::INFINITY;

/// Position of a dual variable relative to its box constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlphaStatus {
    LowerBound,
    UpperBound,
    Free,
}

/// Working-set selection and ρ recovery strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverVariant {
    /// One equality constraint `yᵀα = Δ`
    Standard,
    /// Additional equality on `eᵀα`, handled per label partition
    Nu,
}

/// Stopping configuration for a single solve
#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    /// Tolerance on the maximal violation `Gmax + Gmax2`
    pub epsilon: f64,
    /// Replaces the default safety cap when set
    pub max_iterations: Option<usize>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.001,
            max_iterations: None,
        }
    }
}

/// Outcome of one solve besides the α vector
#[derive(Debug, Clone, PartialEq)]
pub struct SolutionInfo {
    /// Dual objective `½ αᵀQα + pᵀα`
    pub objective: f64,
    /// Bias of the decision function
    pub rho: f64,
    /// ν solver only: mean of the two partition estimates
    pub r: f64,
    pub upper_bound_p: f64,
    pub upper_bound_n: f64,
    pub iterations: usize,
    /// Maximal violation seen at the last working-set selection
    pub gap: f64,
    /// False when the iteration cap stopped the loop
    pub converged: bool,
}

/// Safety cap: `max(10_000_000, min(100·l, i32::MAX))`
pub fn default_max_iterations(l: usize) -> usize {
    let scaled = if l > i32::MAX as usize / 100 {
        i32::MAX as usize
    } else {
        100 * l
    };
    scaled.max(10_000_000)
}

struct WorkingSet {
    pair: Option<(usize, usize)>,
    gap: f64,
}

/// Working state of one solve
///
/// Lives for exactly one call to [`Solver::solve`].
pub struct Solver<'q> {
    variant: SolverVariant,
    q: &'q mut dyn QMatrix,
    qd: Vec<f64>,
    p: Vec<f64>,
    y: Vec<i8>,
    alpha: Vec<f64>,
    /// Gradient of the objective, `Qα + p`
    g: Vec<f64>,
    /// Contribution of upper-bounded variables, `Σ_{α_j = C_j} C_j Q_j`
    g_bar: Vec<f64>,
    cp: f64,
    cn: f64,
    epsilon: f64,
}

impl<'q> Solver<'q> {
    /// Run SMO to convergence or to the iteration cap
    ///
    /// `alpha` must hold a feasible starting point; it is overwritten with the
    /// solution. `cp` and `cn` bound the variables with `y = +1` and `y = -1`.
    pub fn solve(
        variant: SolverVariant,
        q: &'q mut dyn QMatrix,
        p: &[f64],
        y: &[i8],
        alpha: &mut [f64],
        (cp, cn): (f64, f64),
        config: &SolverConfig,
    ) -> SolutionInfo {
        let l = q.len();
        debug_assert_eq!(p.len(), l);
        debug_assert_eq!(y.len(), l);
        debug_assert_eq!(alpha.len(), l);

        let mut solver = Solver {
            variant,
            qd: q.diagonal().to_vec(),
            q,
            p: p.to_vec(),
            y: y.to_vec(),
            alpha: alpha.to_vec(),
            g: p.to_vec(),
            g_bar: vec![0.0; l],
            cp,
            cn,
            epsilon: config.epsilon,
        };
        solver.init_gradient();

        let max_iterations = config
            .max_iterations
            .unwrap_or_else(|| default_max_iterations(l));
        let mut iterations = 0;
        let mut converged = false;
        let mut gap = INF;

        while iterations < max_iterations {
            let selection = solver.select_working_set();
            gap = selection.gap;
            match selection.pair {
                Some((i, j)) => {
                    iterations += 1;
                    solver.update_pair(i, j);
                }
                None => {
                    converged = true;
                    break;
                }
            }
        }

        if !converged {
            warn!(
                "reached max number of iterations ({}), violation {:.3e}",
                max_iterations, gap
            );
        }

        let (rho, r) = solver.calculate_rho();
        let objective = solver
            .alpha
            .iter()
            .zip(solver.g.iter().zip(&solver.p))
            .map(|(a, (g, p))| a * (g + p))
            .sum::<f64>()
            / 2.0;

        let stats = solver.q.cache_stats();
        debug!(
            "optimization finished, #iter = {}, obj = {:.6}, rho = {:.6}, cache hit rate {:.1}%",
            iterations,
            objective,
            rho,
            stats.hit_rate() * 100.0
        );

        alpha.copy_from_slice(&solver.alpha);

        SolutionInfo {
            objective,
            rho,
            r,
            upper_bound_p: cp,
            upper_bound_n: cn,
            iterations,
            gap,
            converged,
        }
    }

    fn init_gradient(&mut self) {
        let l = self.alpha.len();
        for i in 0..l {
            if self.is_lower_bound(i) {
                continue;
            }
            let q_i = self.q.row(i);
            let alpha_i = self.alpha[i];
            for (g, &q) in self.g.iter_mut().zip(q_i.iter()) {
                *g += alpha_i * q;
            }
            if self.is_upper_bound(i) {
                let c_i = self.bound(i);
                for (g_bar, &q) in self.g_bar.iter_mut().zip(q_i.iter()) {
                    *g_bar += c_i * q;
                }
            }
        }
    }

    #[inline]
    fn bound(&self, i: usize) -> f64 {
        if self.y[i] > 0 {
            self.cp
        } else {
            self.cn
        }
    }

    #[inline]
    fn status(&self, i: usize) -> AlphaStatus {
        if self.alpha[i] >= self.bound(i) {
            AlphaStatus::UpperBound
        } else if self.alpha[i] <= 0.0 {
            AlphaStatus::LowerBound
        } else {
            AlphaStatus::Free
        }
    }

    #[inline]
    fn is_upper_bound(&self, i: usize) -> bool {
        self.status(i) == AlphaStatus::UpperBound
    }

    #[inline]
    fn is_lower_bound(&self, i: usize) -> bool {
        self.status(i) == AlphaStatus::LowerBound
    }

    fn select_working_set(&mut self) -> WorkingSet {
        match self.variant {
            SolverVariant::Standard => self.select_working_set_standard(),
            SolverVariant::Nu => self.select_working_set_nu(),
        }
    }

    /// Second-order estimate of the objective decrease for a candidate j
    #[inline]
    fn objective_decrease(grad_diff: f64, quad_coef: f64) -> f64 {
        let quad_coef = if quad_coef > 0.0 { quad_coef } else { TAU };
        -(grad_diff * grad_diff) / quad_coef
    }

    fn select_working_set_standard(&mut self) -> WorkingSet {
        let l = self.alpha.len();
        let mut gmax = -INF;
        let mut gmax2 = -INF;
        let mut gmax_idx = None;
        let mut gmin_idx = None;
        let mut obj_diff_min = INF;

        // i maximizes -y_i * grad(f)_i over I_up
        for t in 0..l {
            if self.y[t] == 1 {
                if !self.is_upper_bound(t) && -self.g[t] >= gmax {
                    gmax = -self.g[t];
                    gmax_idx = Some(t);
                }
            } else if !self.is_lower_bound(t) && self.g[t] >= gmax {
                gmax = self.g[t];
                gmax_idx = Some(t);
            }
        }

        let q_i = gmax_idx.map(|i| self.q.row(i));

        // j minimizes the estimated objective decrease over I_low
        for j in 0..l {
            if self.y[j] == 1 {
                if self.is_lower_bound(j) {
                    continue;
                }
                let grad_diff = gmax + self.g[j];
                if self.g[j] >= gmax2 {
                    gmax2 = self.g[j];
                }
                if grad_diff > 0.0 {
                    if let (Some(i), Some(q_i)) = (gmax_idx, q_i.as_ref()) {
                        let quad_coef =
                            self.qd[i] + self.qd[j] - 2.0 * f64::from(self.y[i]) * q_i[j];
                        let obj_diff = Self::objective_decrease(grad_diff, quad_coef);
                        if obj_diff <= obj_diff_min {
                            gmin_idx = Some(j);
                            obj_diff_min = obj_diff;
                        }
                    }
                }
            } else {
                if self.is_upper_bound(j) {
                    continue;
                }
                let grad_diff = gmax - self.g[j];
                if -self.g[j] >= gmax2 {
                    gmax2 = -self.g[j];
                }
                if grad_diff > 0.0 {
                    if let (Some(i), Some(q_i)) = (gmax_idx, q_i.as_ref()) {
                        let quad_coef =
                            self.qd[i] + self.qd[j] + 2.0 * f64::from(self.y[i]) * q_i[j];
                        let obj_diff = Self::objective_decrease(grad_diff, quad_coef);
                        if obj_diff <= obj_diff_min {
                            gmin_idx = Some(j);
                            obj_diff_min = obj_diff;
                        }
                    }
                }
            }
        }

        let gap = gmax + gmax2;
        let pair = match (gmax_idx, gmin_idx) {
            (Some(i), Some(j)) if gap >= self.epsilon => Some((i, j)),
            _ => None,
        };
        WorkingSet { pair, gap }
    }

    fn select_working_set_nu(&mut self) -> WorkingSet {
        let l = self.alpha.len();
        let mut gmaxp = -INF;
        let mut gmaxp2 = -INF;
        let mut gmaxp_idx = None;
        let mut gmaxn = -INF;
        let mut gmaxn2 = -INF;
        let mut gmaxn_idx = None;
        let mut gmin_idx = None;
        let mut obj_diff_min = INF;

        for t in 0..l {
            if self.y[t] == 1 {
                if !self.is_upper_bound(t) && -self.g[t] >= gmaxp {
                    gmaxp = -self.g[t];
                    gmaxp_idx = Some(t);
                }
            } else if !self.is_lower_bound(t) && self.g[t] >= gmaxn {
                gmaxn = self.g[t];
                gmaxn_idx = Some(t);
            }
        }

        let q_ip = gmaxp_idx.map(|i| self.q.row(i));
        let q_in = gmaxn_idx.map(|i| self.q.row(i));

        for j in 0..l {
            if self.y[j] == 1 {
                if self.is_lower_bound(j) {
                    continue;
                }
                let grad_diff = gmaxp + self.g[j];
                if self.g[j] >= gmaxp2 {
                    gmaxp2 = self.g[j];
                }
                if grad_diff > 0.0 {
                    if let (Some(ip), Some(q_ip)) = (gmaxp_idx, q_ip.as_ref()) {
                        let quad_coef = self.qd[ip] + self.qd[j] - 2.0 * q_ip[j];
                        let obj_diff = Self::objective_decrease(grad_diff, quad_coef);
                        if obj_diff <= obj_diff_min {
                            gmin_idx = Some(j);
                            obj_diff_min = obj_diff;
                        }
                    }
                }
            } else {
                if self.is_upper_bound(j) {
                    continue;
                }
                let grad_diff = gmaxn - self.g[j];
                if -self.g[j] >= gmaxn2 {
                    gmaxn2 = -self.g[j];
                }
                if grad_diff > 0.0 {
                    if let (Some(in_), Some(q_in)) = (gmaxn_idx, q_in.as_ref()) {
                        let quad_coef = self.qd[in_] + self.qd[j] - 2.0 * q_in[j];
                        let obj_diff = Self::objective_decrease(grad_diff, quad_coef);
                        if obj_diff <= obj_diff_min {
                            gmin_idx = Some(j);
                            obj_diff_min = obj_diff;
                        }
                    }
                }
            }
        }

        let gap = f64::max(gmaxp + gmaxp2, gmaxn + gmaxn2);
        if gap < self.epsilon {
            return WorkingSet { pair: None, gap };
        }

        // i comes from the partition of the chosen j
        let pair = gmin_idx.and_then(|j| {
            let i = if self.y[j] == 1 { gmaxp_idx } else { gmaxn_idx };
            i.map(|i| (i, j))
        });
        WorkingSet { pair, gap }
    }

    /// Analytic solution of the two-variable sub-problem, then gradient upkeep
    fn update_pair(&mut self, i: usize, j: usize) {
        let q_i = self.q.row(i);
        let q_j = self.q.row(j);

        let c_i = self.bound(i);
        let c_j = self.bound(j);

        let old_alpha_i = self.alpha[i];
        let old_alpha_j = self.alpha[j];
        let was_upper_i = self.is_upper_bound(i);
        let was_upper_j = self.is_upper_bound(j);

        if self.y[i] != self.y[j] {
            // α_i - α_j stays constant
            let mut quad_coef = self.qd[i] + self.qd[j] + 2.0 * q_i[j];
            if quad_coef <= 0.0 {
                quad_coef = TAU;
            }
            let delta = (-self.g[i] - self.g[j]) / quad_coef;
            let diff = self.alpha[i] - self.alpha[j];
            self.alpha[i] += delta;
            self.alpha[j] += delta;

            if diff > 0.0 {
                if self.alpha[j] < 0.0 {
                    self.alpha[j] = 0.0;
                    self.alpha[i] = diff;
                }
            } else if self.alpha[i] < 0.0 {
                self.alpha[i] = 0.0;
                self.alpha[j] = -diff;
            }
            if diff > c_i - c_j {
                if self.alpha[i] > c_i {
                    self.alpha[i] = c_i;
                    self.alpha[j] = c_i - diff;
                }
            } else if self.alpha[j] > c_j {
                self.alpha[j] = c_j;
                self.alpha[i] = c_j + diff;
            }
        } else {
            // α_i + α_j stays constant
            let mut quad_coef = self.qd[i] + self.qd[j] - 2.0 * q_i[j];
            if quad_coef <= 0.0 {
                quad_coef = TAU;
            }
            let delta = (self.g[i] - self.g[j]) / quad_coef;
            let sum = self.alpha[i] + self.alpha[j];
            self.alpha[i] -= delta;
            self.alpha[j] += delta;

            if sum > c_i {
                if self.alpha[i] > c_i {
                    self.alpha[i] = c_i;
                    self.alpha[j] = sum - c_i;
                }
            } else if self.alpha[j] < 0.0 {
                self.alpha[j] = 0.0;
                self.alpha[i] = sum;
            }
            if sum > c_j {
                if self.alpha[j] > c_j {
                    self.alpha[j] = c_j;
                    self.alpha[i] = sum - c_j;
                }
            } else if self.alpha[i] < 0.0 {
                self.alpha[i] = 0.0;
                self.alpha[j] = sum;
            }
        }

        let delta_alpha_i = self.alpha[i] - old_alpha_i;
        let delta_alpha_j = self.alpha[j] - old_alpha_j;
        for (k, g) in self.g.iter_mut().enumerate() {
            *g += q_i[k] * delta_alpha_i + q_j[k] * delta_alpha_j;
        }

        // G_bar only changes when a variable enters or leaves its upper bound
        if was_upper_i != self.is_upper_bound(i) {
            let sign = if was_upper_i { -1.0 } else { 1.0 };
            for (k, g_bar) in self.g_bar.iter_mut().enumerate() {
                *g_bar += sign * c_i * q_i[k];
            }
        }
        if was_upper_j != self.is_upper_bound(j) {
            let sign = if was_upper_j { -1.0 } else { 1.0 };
            for (k, g_bar) in self.g_bar.iter_mut().enumerate() {
                *g_bar += sign * c_j * q_j[k];
            }
        }
    }

    fn calculate_rho(&self) -> (f64, f64) {
        match self.variant {
            SolverVariant::Standard => (self.calculate_rho_standard(), 0.0),
            SolverVariant::Nu => self.calculate_rho_nu(),
        }
    }

    fn calculate_rho_standard(&self) -> f64 {
        let mut nr_free = 0;
        let mut ub = INF;
        let mut lb = -INF;
        let mut sum_free = 0.0;

        for i in 0..self.alpha.len() {
            let yg = f64::from(self.y[i]) * self.g[i];

            match self.status(i) {
                AlphaStatus::UpperBound => {
                    if self.y[i] == -1 {
                        ub = ub.min(yg);
                    } else {
                        lb = lb.max(yg);
                    }
                }
                AlphaStatus::LowerBound => {
                    if self.y[i] == 1 {
                        ub = ub.min(yg);
                    } else {
                        lb = lb.max(yg);
                    }
                }
                AlphaStatus::Free => {
                    nr_free += 1;
                    sum_free += yg;
                }
            }
        }

        if nr_free > 0 {
            sum_free / nr_free as f64
        } else {
            (ub + lb) / 2.0
        }
    }

    /// Returns `(ρ, r)` with `ρ = (r1 - r2)/2` and `r = (r1 + r2)/2`
    fn calculate_rho_nu(&self) -> (f64, f64) {
        // Index 0 collects y = +1, index 1 collects y = -1
        let mut nr_free = [0usize; 2];
        let mut ub = [INF; 2];
        let mut lb = [-INF; 2];
        let mut sum_free = [0.0; 2];

        for i in 0..self.alpha.len() {
            let part = if self.y[i] == 1 { 0 } else { 1 };
            match self.status(i) {
                AlphaStatus::UpperBound => lb[part] = lb[part].max(self.g[i]),
                AlphaStatus::LowerBound => ub[part] = ub[part].min(self.g[i]),
                AlphaStatus::Free => {
                    nr_free[part] += 1;
                    sum_free[part] += self.g[i];
                }
            }
        }

        let estimate = |part: usize| {
            if nr_free[part] > 0 {
                sum_free[part] / nr_free[part] as f64
            } else {
                (ub[part] + lb[part]) / 2.0
            }
        };
        let r1 = estimate(0);
        let r2 = estimate(1);

        ((r1 - r2) / 2.0, (r1 + r2) / 2.0)
    }

    /// Snapshot of the gradient-bar vector
    #[cfg(test)]
    fn gradient_bar(&self) -> &[f64] {
        &self.g_bar
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SparseVector;
    use crate::kernel::{LinearKernel, RBFKernel};
    use crate::solver::qmatrix::ClassificationQ;
    use approx::assert_abs_diff_eq;

    fn line_points(values: &[f64]) -> Vec<SparseVector> {
        values.iter().map(|&v| SparseVector::from_dense(&[v])).collect()
    }

    #[test]
    fn test_two_point_problem_has_closed_form() {
        let data = line_points(&[1.0, -1.0]);
        let x: Vec<&SparseVector> = data.iter().collect();
        let y = [1i8, -1];
        let kernel = LinearKernel::new();
        let mut q = ClassificationQ::new(&x, &y, &kernel, 1 << 20);
        let mut alpha = vec![0.0; 2];

        let info = Solver::solve(
            SolverVariant::Standard,
            &mut q,
            &[-1.0, -1.0],
            &y,
            &mut alpha,
            (1.0, 1.0),
            &SolverConfig::default(),
        );

        assert!(info.converged);
        assert_eq!(info.iterations, 1);
        assert_abs_diff_eq!(alpha[0], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(alpha[1], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(info.rho, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(info.objective, -0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_overlapping_classes_respect_box_and_gap() {
        let data = line_points(&[0.0, 0.4, 0.8, 1.2, 0.2, 0.6, 1.0, 1.4, -0.3, 1.7]);
        let x: Vec<&SparseVector> = data.iter().collect();
        let y = [1i8, -1, 1, -1, 1, -1, 1, -1, 1, -1];
        let kernel = RBFKernel::new(2.0);
        let mut q = ClassificationQ::new(&x, &y, &kernel, 1 << 20);
        let mut alpha = vec![0.0; y.len()];
        let (cp, cn) = (0.5, 0.8);
        let config = SolverConfig {
            epsilon: 1e-4,
            max_iterations: None,
        };

        let info = Solver::solve(
            SolverVariant::Standard,
            &mut q,
            &vec![-1.0; y.len()],
            &y,
            &mut alpha,
            (cp, cn),
            &config,
        );

        assert!(info.converged);
        assert!(info.gap < config.epsilon);
        for (a, &label) in alpha.iter().zip(&y) {
            let c = if label > 0 { cp } else { cn };
            assert!(*a >= 0.0 && *a <= c, "alpha {} outside [0, {}]", a, c);
        }
        // Equality constraint yᵀα = 0 is preserved from the zero start
        let balance: f64 = alpha.iter().zip(&y).map(|(a, &l)| a * f64::from(l)).sum();
        assert_abs_diff_eq!(balance, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_iteration_cap_returns_partial_solution() {
        let data = line_points(&[0.0, 0.4, 0.8, 1.2, 0.2, 0.6]);
        let x: Vec<&SparseVector> = data.iter().collect();
        let y = [1i8, -1, 1, -1, 1, -1];
        let kernel = RBFKernel::new(1.0);
        let mut q = ClassificationQ::new(&x, &y, &kernel, 1 << 20);
        let mut alpha = vec![0.0; y.len()];
        let config = SolverConfig {
            epsilon: 1e-6,
            max_iterations: Some(1),
        };

        let info = Solver::solve(
            SolverVariant::Standard,
            &mut q,
            &vec![-1.0; y.len()],
            &y,
            &mut alpha,
            (10.0, 10.0),
            &config,
        );

        assert!(!info.converged);
        assert_eq!(info.iterations, 1);
        assert!(alpha.iter().all(|&a| (0.0..=10.0).contains(&a)));
    }

    #[test]
    fn test_gradient_bar_tracks_upper_bounded_variables() {
        let data = line_points(&[0.0, 0.1, 0.05, 0.15]);
        let x: Vec<&SparseVector> = data.iter().collect();
        let y = [1i8, -1, -1, 1];
        let kernel = LinearKernel::new();
        let mut q = ClassificationQ::new(&x, &y, &kernel, 1 << 20);
        let mut alpha = vec![0.0; 4];

        let mut solver = Solver {
            variant: SolverVariant::Standard,
            qd: q.diagonal().to_vec(),
            q: &mut q,
            p: vec![-1.0; 4],
            y: y.to_vec(),
            alpha: alpha.clone(),
            g: vec![-1.0; 4],
            g_bar: vec![0.0; 4],
            cp: 0.1,
            cn: 0.1,
            epsilon: 1e-3,
        };
        solver.init_gradient();
        while let Some((i, j)) = solver.select_working_set().pair {
            solver.update_pair(i, j);
        }
        alpha.copy_from_slice(&solver.alpha);

        let mut expected = vec![0.0; 4];
        for i in 0..4 {
            if alpha[i] >= 0.1 {
                let row = solver.q.row(i);
                for k in 0..4 {
                    expected[k] += 0.1 * row[k];
                }
            }
        }
        for k in 0..4 {
            assert_abs_diff_eq!(solver.gradient_bar()[k], expected[k], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_default_iteration_cap() {
        assert_eq!(default_max_iterations(10), 10_000_000);
        assert_eq!(default_max_iterations(1_000_000), 100_000_000);
        assert_eq!(default_max_iterations(usize::MAX / 2), i32::MAX as usize);
    }
}
