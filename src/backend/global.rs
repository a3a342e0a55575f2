//! Budget-driven global search.
//!
//! Differential evolution seeded with the initial point. The run stops when
//! the evaluation budget is spent, which is the normal way for it to end.
//! Generations can be evaluated in parallel with rayon; every candidate is
//! evaluated independently, so the objective must be safe to call from
//! several threads at once.

use ndarray::Array1;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FitError, Result};
use crate::parameters::Bounds;

use super::convergence::ConvergenceStatus;
use super::{clip_to_bounds, resolve_bounds, sanitize_cost, BackendResult, OptimizationBackend};

/// Strategies for creating candidate solutions in Differential Evolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DEStrategy {
    /// DE/rand/1: x_r1 + F * (x_r2 - x_r3)
    Rand1,

    /// DE/best/1: x_best + F * (x_r1 - x_r2)
    Best1,

    /// DE/current-to-best/1: x_i + F * (x_best - x_i) + F * (x_r1 - x_r2)
    CurrentToBest1,
}

/// Configuration options for the global derivative-free backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Total number of objective evaluations. Default: 100
    pub budget: usize,

    /// Random seed; `None` seeds from entropy. Default: None
    pub seed: Option<u64>,

    /// Population size; `None` uses 10 * max(dimension, 4). Default: None
    pub population_size: Option<usize>,

    /// Differential weight (F) in range [0, 2]. Default: 0.8
    pub differential_weight: f64,

    /// Crossover probability (CR) in range [0, 1]. Default: 0.9
    pub crossover_prob: f64,

    /// Mutation strategy. Default: Rand1
    pub strategy: DEStrategy,

    /// Relative spread of the initial population around unbounded
    /// coordinates of the starting point. Default: 1.0
    pub initial_spread: f64,

    /// Evaluate each generation in parallel. Default: false
    pub parallel: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            budget: 100,
            seed: None,
            population_size: None,
            differential_weight: 0.8,
            crossover_prob: 0.9,
            strategy: DEStrategy::Rand1,
            initial_spread: 1.0,
            parallel: false,
        }
    }
}

impl GlobalConfig {
    /// Config with the given evaluation budget and defaults otherwise.
    pub fn with_budget(budget: usize) -> Self {
        Self {
            budget,
            ..Self::default()
        }
    }

    /// Set the random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the population size.
    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = Some(size);
        self
    }

    /// Set the mutation strategy.
    pub fn with_strategy(mut self, strategy: DEStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Enable or disable parallel evaluation of generations.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Stochastic, budget-driven global search.
#[derive(Debug, Clone, Default)]
pub struct GlobalDerivativeFreeBackend {
    config: GlobalConfig,
}

impl GlobalDerivativeFreeBackend {
    /// Create a backend with the given evaluation budget.
    pub fn new(budget: usize) -> Self {
        Self::with_config(GlobalConfig::with_budget(budget))
    }

    /// Create a backend with the given configuration.
    pub fn with_config(config: GlobalConfig) -> Self {
        Self { config }
    }

    /// Set the random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    fn population_size(&self, n_params: usize) -> usize {
        self.config
            .population_size
            .unwrap_or(10 * n_params.max(4))
            .max(1)
            .min(self.config.budget)
    }

    /// Draw a starting individual around `x0`.
    ///
    /// Coordinates with two finite sides are sampled uniformly; open or
    /// infinite ones from a normal distribution centred on the starting value.
    fn sample_around(&self, x0: &Array1<f64>, bounds: &[Bounds], rng: &mut StdRng) -> Array1<f64> {
        let point = x0
            .iter()
            .zip(bounds.iter())
            .map(|(&center, b)| match (b.lower_or_inf(), b.upper_or_inf()) {
                (lo, hi) if lo.is_finite() && hi.is_finite() && lo < hi => rng.gen_range(lo..hi),
                (lo, hi) if lo == hi => lo,
                _ => {
                    let sigma = self.config.initial_spread * center.abs().max(1.0);
                    let value = Normal::new(center, sigma)
                        .map(|d| d.sample(rng))
                        .unwrap_or(center);
                    b.clamp(value)
                }
            })
            .collect::<Vec<f64>>();
        Array1::from_vec(point)
    }

    /// Create a trial vector for `target_idx` using the configured strategy.
    fn create_trial_vector(
        &self,
        target_idx: usize,
        population: &[Array1<f64>],
        best_idx: usize,
        bounds: &[Bounds],
        rng: &mut StdRng,
    ) -> Array1<f64> {
        let n_params = population[target_idx].len();
        let f = self.config.differential_weight;

        let mut others: Vec<usize> = (0..population.len())
            .filter(|&i| i != target_idx && i != best_idx)
            .collect();
        others.shuffle(rng);

        let mutant = match self.config.strategy {
            DEStrategy::Rand1 if population.len() >= 4 => {
                // The best member may serve as a donor for rand/1
                let mut donors: Vec<usize> =
                    (0..population.len()).filter(|&i| i != target_idx).collect();
                donors.shuffle(rng);
                let (r1, r2, r3) = (donors[0], donors[1], donors[2]);
                &population[r1] + &((&population[r2] - &population[r3]) * f)
            }
            DEStrategy::Best1 if others.len() >= 2 => {
                let (r1, r2) = (others[0], others[1]);
                &population[best_idx] + &((&population[r1] - &population[r2]) * f)
            }
            DEStrategy::CurrentToBest1 if others.len() >= 2 => {
                let (r1, r2) = (others[0], others[1]);
                let target = &population[target_idx];
                target
                    + &((&population[best_idx] - target) * f)
                    + &((&population[r1] - &population[r2]) * f)
            }
            // Too few members for vector differences: perturb the best one
            _ => {
                let best = &population[best_idx];
                let mut mutant = best.clone();
                for (j, value) in mutant.iter_mut().enumerate() {
                    let sigma = 0.1 * self.config.initial_spread * best[j].abs().max(1.0);
                    if let Ok(d) = Normal::new(*value, sigma) {
                        *value = d.sample(rng);
                    }
                }
                return clip_to_bounds(&mutant, bounds);
            }
        };

        // Binomial crossover with the target vector
        let target = &population[target_idx];
        let j_rand = rng.gen_range(0..n_params);
        let mut trial = mutant;
        for j in 0..n_params {
            if j != j_rand && rng.gen::<f64>() > self.config.crossover_prob {
                trial[j] = target[j];
            }
        }

        clip_to_bounds(&trial, bounds)
    }

    fn evaluate<F>(&self, objective: &F, points: &[Array1<f64>]) -> Result<Vec<f64>>
    where
        F: Fn(&Array1<f64>) -> Result<f64> + Sync,
    {
        if self.config.parallel {
            points
                .par_iter()
                .map(|p| objective(p).map(sanitize_cost))
                .collect()
        } else {
            points
                .iter()
                .map(|p| objective(p).map(sanitize_cost))
                .collect()
        }
    }
}

fn best_index(costs: &[f64]) -> usize {
    costs
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

impl OptimizationBackend for GlobalDerivativeFreeBackend {
    fn name(&self) -> &'static str {
        "global-derivative-free"
    }

    fn minimize<F>(
        &self,
        objective: F,
        x0: &Array1<f64>,
        bounds: Option<&[Bounds]>,
    ) -> Result<BackendResult>
    where
        F: Fn(&Array1<f64>) -> Result<f64> + Sync,
    {
        let budget = self.config.budget;
        if budget == 0 {
            return Err(FitError::InvalidConfig(
                "Global backend needs an evaluation budget of at least 1".to_string(),
            ));
        }

        let bounds = resolve_bounds(x0, bounds)?;
        let start = clip_to_bounds(x0, &bounds);
        let n_params = start.len();

        if n_params == 0 {
            let cost = sanitize_cost(objective(&start)?);
            return Ok(BackendResult {
                params: start,
                cost,
                iterations: 0,
                func_evals: 1,
                status: ConvergenceStatus::GradientConvergence,
                message: "No free parameters".to_string(),
            });
        }

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        // The starting point is always a member of the initial population
        let pop_size = self.population_size(n_params);
        let mut population = Vec::with_capacity(pop_size);
        population.push(start.clone());
        while population.len() < pop_size {
            population.push(self.sample_around(&start, &bounds, &mut rng));
        }

        let mut costs = self.evaluate(&objective, &population)?;
        let mut func_evals = population.len();
        let mut best_idx = best_index(&costs);
        let mut generations = 0;

        while func_evals < budget {
            let batch = pop_size.min(budget - func_evals);
            let trials: Vec<Array1<f64>> = (0..batch)
                .map(|i| self.create_trial_vector(i, &population, best_idx, &bounds, &mut rng))
                .collect();

            let trial_costs = self.evaluate(&objective, &trials)?;
            func_evals += batch;

            for (i, (trial, cost)) in trials.into_iter().zip(trial_costs).enumerate() {
                if cost <= costs[i] {
                    population[i] = trial;
                    costs[i] = cost;
                }
            }
            best_idx = best_index(&costs);
            generations += 1;

            debug!(
                generation = generations,
                evaluations = func_evals,
                best_cost = costs[best_idx],
                "global generation"
            );
        }

        let status = ConvergenceStatus::BudgetExhausted;
        Ok(BackendResult {
            params: population[best_idx].clone(),
            cost: costs[best_idx],
            iterations: generations,
            func_evals,
            status,
            message: status.description(),
        })
    }
}
