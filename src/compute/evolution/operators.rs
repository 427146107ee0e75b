//! Variation and selection operators.
//!
//! Each operator is a strategy object chosen from configuration, so the
//! search loop never branches on operator kind.

use std::cmp::Ordering;

use crate::schema::{CrossoverMethod, GeneticAlgorithmConfig, MutationMethod, SelectionMethod};

use super::fitness::Fitness;
use super::genome::{GeneSpace, GenomeRng};

/// Recombines two gene vectors in place.
pub trait CrossoverOperator {
    fn crossover(&self, a: &mut [f64], b: &mut [f64], rng: &mut GenomeRng);
}

/// Perturbs one gene vector in place.
pub trait MutationOperator {
    fn mutate(&self, genes: &mut [f64], space: &GeneSpace, rng: &mut GenomeRng);
}

/// Picks `k` indices from a scored population.
pub trait SelectionOperator {
    fn select(
        &self,
        fitness: &[Fitness],
        weights: &[f64],
        k: usize,
        rng: &mut GenomeRng,
    ) -> Vec<usize>;
}

/// Blend crossover (BLX-alpha).
#[derive(Debug, Clone, Copy)]
pub struct BlendCrossover {
    pub alpha: f64,
}

impl CrossoverOperator for BlendCrossover {
    fn crossover(&self, a: &mut [f64], b: &mut [f64], rng: &mut GenomeRng) {
        for (x, y) in a.iter_mut().zip(b.iter_mut()) {
            let gamma = (1.0 + 2.0 * self.alpha) * rng.unit() - self.alpha;
            let (x0, y0) = (*x, *y);
            *x = (1.0 - gamma) * x0 + gamma * y0;
            *y = gamma * x0 + (1.0 - gamma) * y0;
        }
    }
}

/// Bounded polynomial mutation with distribution index `eta`.
#[derive(Debug, Clone, Copy)]
pub struct PolynomialBoundedMutation {
    pub eta: f64,
    pub indpb: f64,
}

impl MutationOperator for PolynomialBoundedMutation {
    fn mutate(&self, genes: &mut [f64], space: &GeneSpace, rng: &mut GenomeRng) {
        let mut_pow = 1.0 / (self.eta + 1.0);
        for (gene, &(lo, hi)) in genes.iter_mut().zip(space.bounds()) {
            if !rng.chance(self.indpb) {
                continue;
            }
            let span = hi - lo;
            if span <= 0.0 {
                continue;
            }
            // Out-of-bound input would push the power terms below zero.
            let x = gene.clamp(lo, hi);
            let delta_1 = (x - lo) / span;
            let delta_2 = (hi - x) / span;
            let r = rng.unit();

            let delta_q = if r < 0.5 {
                let xy = 1.0 - delta_1;
                let val = 2.0 * r + (1.0 - 2.0 * r) * xy.powf(self.eta + 1.0);
                val.powf(mut_pow) - 1.0
            } else {
                let xy = 1.0 - delta_2;
                let val = 2.0 * (1.0 - r) + 2.0 * (r - 0.5) * xy.powf(self.eta + 1.0);
                1.0 - val.powf(mut_pow)
            };

            *gene = (x + delta_q * span).clamp(lo, hi);
        }
    }
}

/// Additive Gaussian mutation.
#[derive(Debug, Clone, Copy)]
pub struct GaussianMutation {
    pub mu: f64,
    pub sigma: f64,
    pub indpb: f64,
}

impl MutationOperator for GaussianMutation {
    fn mutate(&self, genes: &mut [f64], _space: &GeneSpace, rng: &mut GenomeRng) {
        for gene in genes.iter_mut() {
            if rng.chance(self.indpb) {
                *gene += rng.gaussian(self.mu, self.sigma);
            }
        }
    }
}

/// Tournament selection with replacement.
#[derive(Debug, Clone, Copy)]
pub struct TournamentSelection {
    pub size: usize,
}

impl SelectionOperator for TournamentSelection {
    fn select(
        &self,
        fitness: &[Fitness],
        weights: &[f64],
        k: usize,
        rng: &mut GenomeRng,
    ) -> Vec<usize> {
        if fitness.is_empty() {
            return Vec::new();
        }
        (0..k)
            .map(|_| {
                let mut best = rng.index(fitness.len());
                for _ in 1..self.size {
                    let challenger = rng.index(fitness.len());
                    if fitness[challenger].weighted_cmp(&fitness[best], weights)
                        == Ordering::Greater
                    {
                        best = challenger;
                    }
                }
                best
            })
            .collect()
    }
}

/// Deterministic truncation: the best `k` under the weighted order.
#[derive(Debug, Clone, Copy)]
pub struct BestSelection;

impl SelectionOperator for BestSelection {
    fn select(
        &self,
        fitness: &[Fitness],
        weights: &[f64],
        k: usize,
        _rng: &mut GenomeRng,
    ) -> Vec<usize> {
        let mut order: Vec<usize> = (0..fitness.len()).collect();
        order.sort_by(|&a, &b| fitness[b].weighted_cmp(&fitness[a], weights));
        order.into_iter().cycle().take(k).collect()
    }
}

/// Offspring genes and the population indices they came from.
#[derive(Debug, Clone)]
pub struct Offspring {
    pub genes: Vec<f64>,
    pub parents: Vec<usize>,
}

/// Operator set of a genetic algorithm run.
pub struct Operators {
    pub crossover: Box<dyn CrossoverOperator>,
    pub mutation: Box<dyn MutationOperator>,
    pub selection: Box<dyn SelectionOperator>,
    pub crossover_rate: f64,
    pub mutation_rate: f64,
}

impl Operators {
    pub fn from_config(config: &GeneticAlgorithmConfig) -> Self {
        let crossover: Box<dyn CrossoverOperator> = match config.crossover {
            CrossoverMethod::Blend { alpha } => Box::new(BlendCrossover { alpha }),
        };
        let mutation: Box<dyn MutationOperator> = match config.mutation {
            MutationMethod::PolynomialBounded { eta, indpb } => {
                Box::new(PolynomialBoundedMutation { eta, indpb })
            }
            MutationMethod::Gaussian { mu, sigma, indpb } => {
                Box::new(GaussianMutation { mu, sigma, indpb })
            }
        };
        let selection: Box<dyn SelectionOperator> = match config.selection {
            SelectionMethod::Tournament { size } => Box::new(TournamentSelection { size }),
            SelectionMethod::Best => Box::new(BestSelection),
        };
        Self {
            crossover,
            mutation,
            selection,
            crossover_rate: config.crossover_rate,
            mutation_rate: config.mutation_rate,
        }
    }

    /// Cross consecutive pairs, then mutate each child, then clamp.
    ///
    /// Returns one offspring per parent, in population order.
    pub fn vary_and(
        &self,
        parents: &[Vec<f64>],
        space: &GeneSpace,
        rng: &mut GenomeRng,
    ) -> Vec<Offspring> {
        let mut offspring: Vec<Offspring> = parents
            .iter()
            .enumerate()
            .map(|(i, genes)| Offspring {
                genes: genes.clone(),
                parents: vec![i],
            })
            .collect();

        for pair in offspring.chunks_exact_mut(2) {
            if rng.chance(self.crossover_rate) {
                let (left, right) = pair.split_at_mut(1);
                let (a, b) = (&mut left[0], &mut right[0]);
                self.crossover.crossover(&mut a.genes, &mut b.genes, rng);
                let (pa, pb) = (a.parents[0], b.parents[0]);
                a.parents.push(pb);
                b.parents.push(pa);
            }
        }

        for child in &mut offspring {
            if rng.chance(self.mutation_rate) {
                self.mutation.mutate(&mut child.genes, space, rng);
            }
            space.clamp(&mut child.genes);
        }

        offspring
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::CandidateBounds;
    use proptest::prelude::*;

    fn space() -> GeneSpace {
        GeneSpace::new(&CandidateBounds::default(), 14)
    }

    #[test]
    fn test_blend_zero_alpha_stays_between_parents() {
        let op = BlendCrossover { alpha: 0.0 };
        let mut rng = GenomeRng::new(1);
        for _ in 0..50 {
            let mut a = vec![1.0, 4.0];
            let mut b = vec![3.0, 2.0];
            op.crossover(&mut a, &mut b, &mut rng);
            assert!(a[0] >= 1.0 && a[0] <= 3.0);
            assert!(a[1] >= 2.0 && a[1] <= 4.0);
            // Blend preserves the pair sum per gene.
            assert!((a[0] + b[0] - 4.0).abs() < 1e-12);
            assert!((a[1] + b[1] - 6.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_polynomial_zero_span_untouched() {
        let bounds = CandidateBounds {
            slot_thickness: (2.0, 2.0),
            ..Default::default()
        };
        let space = GeneSpace::new(&bounds, 14);
        let op = PolynomialBoundedMutation {
            eta: 20.0,
            indpb: 1.0,
        };
        let mut rng = GenomeRng::new(3);
        let mut genes = vec![2.0, 5.0, 5.0, 5.0, 3.0];
        op.mutate(&mut genes, &space, &mut rng);
        assert_eq!(genes[0], 2.0);
    }

    #[test]
    fn test_tournament_prefers_better() {
        let weights = [1.0];
        let fitness: Vec<Fitness> = (0..10).map(|i| Fitness::from_values(vec![i as f64])).collect();
        let op = TournamentSelection { size: 10 };
        let mut rng = GenomeRng::new(5);
        let selected = op.select(&fitness, &weights, 200, &mut rng);
        assert_eq!(selected.len(), 200);
        let mean = selected.iter().sum::<usize>() as f64 / 200.0;
        assert!(mean > 7.0);
    }

    #[test]
    fn test_tournament_on_empty() {
        let op = TournamentSelection { size: 3 };
        assert!(op.select(&[], &[1.0], 5, &mut GenomeRng::new(0)).is_empty());
    }

    #[test]
    fn test_best_selection_order() {
        let weights = [-1.0];
        let fitness: Vec<Fitness> = [3.0, 1.0, 2.0]
            .iter()
            .map(|&v| Fitness::from_values(vec![v]))
            .collect();
        let selected = BestSelection.select(&fitness, &weights, 4, &mut GenomeRng::new(0));
        assert_eq!(selected, vec![1, 2, 0, 1]);
    }

    #[test]
    fn test_vary_and_tracks_parents() {
        let ops = Operators::from_config(&GeneticAlgorithmConfig {
            crossover_rate: 1.0,
            mutation_rate: 0.0,
            ..Default::default()
        });
        let space = space();
        let mut rng = GenomeRng::new(9);
        let parents: Vec<Vec<f64>> = (0..3).map(|_| space.random_genes(&mut rng)).collect();
        let offspring = ops.vary_and(&parents, &space, &mut rng);
        assert_eq!(offspring.len(), 3);
        assert_eq!(offspring[0].parents, vec![0, 1]);
        assert_eq!(offspring[1].parents, vec![1, 0]);
        // The odd one out is copied unchanged.
        assert_eq!(offspring[2].parents, vec![2]);
        assert_eq!(offspring[2].genes, parents[2]);
    }

    proptest! {
        #[test]
        fn prop_vary_and_stays_in_bounds(seed in any::<u64>(), size in 1usize..12) {
            let ops = Operators::from_config(&GeneticAlgorithmConfig {
                crossover_rate: 1.0,
                mutation_rate: 1.0,
                mutation: MutationMethod::Gaussian { mu: 0.0, sigma: 25.0, indpb: 1.0 },
                ..Default::default()
            });
            let space = space();
            let mut rng = GenomeRng::new(seed);
            let parents: Vec<Vec<f64>> = (0..size).map(|_| space.random_genes(&mut rng)).collect();
            for child in ops.vary_and(&parents, &space, &mut rng) {
                let candidate = space.to_candidate(&child.genes);
                prop_assert!(candidate.is_within(space.candidate_bounds(), 14));
                prop_assert_eq!(child.genes[space.wire_gene()].fract(), 0.0);
            }
        }

        #[test]
        fn prop_polynomial_stays_in_bounds(seed in any::<u64>(), x in -50.0f64..50.0) {
            let space = space();
            let op = PolynomialBoundedMutation { eta: 20.0, indpb: 1.0 };
            let mut rng = GenomeRng::new(seed);
            let mut genes = vec![x; space.len()];
            op.mutate(&mut genes, &space, &mut rng);
            for (gene, (lo, hi)) in genes.iter().zip(space.bounds()) {
                prop_assert!(gene >= lo && gene <= hi);
            }
        }
    }
}
