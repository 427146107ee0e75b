//! Gene-space utilities for evolutionary search.
//!
//! Candidates are varied as flat gene vectors (see `Candidate::to_genes`).
//! [`GeneSpace`] knows the bound of every gene and which one is the integer
//! wire index; [`GenomeRng`] is the single random source of a run.

use rand::prelude::*;
use rand_distr::StandardNormal;

use crate::schema::{Candidate, CandidateBounds, clamp_to, clamp_wire_index};

/// Random number generator wrapper for genome operations.
pub struct GenomeRng {
    rng: StdRng,
}

impl GenomeRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Uniform in `[0, 1)`.
    #[inline]
    pub fn unit(&mut self) -> f64 {
        self.rng.r#gen()
    }

    /// Uniform in `[lo, hi]`. Degenerate intervals return `lo`.
    pub fn uniform(&mut self, (lo, hi): (f64, f64)) -> f64 {
        if hi > lo {
            self.rng.gen_range(lo..=hi)
        } else {
            lo
        }
    }

    /// Uniform index in `[0, len)`. Returns 0 for an empty range.
    pub fn index(&mut self, len: usize) -> usize {
        if len == 0 { 0 } else { self.rng.gen_range(0..len) }
    }

    /// True with probability `p`.
    #[inline]
    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.gen_bool(p.clamp(0.0, 1.0))
    }

    /// Normal sample with mean `mu` and standard deviation `sigma`.
    pub fn gaussian(&mut self, mu: f64, sigma: f64) -> f64 {
        let z: f64 = self.rng.sample(StandardNormal);
        mu + sigma * z
    }
}

/// Bounds of every gene, with the wire gene last.
#[derive(Debug, Clone)]
pub struct GeneSpace {
    bounds: Vec<(f64, f64)>,
    candidate_bounds: CandidateBounds,
    catalog_len: usize,
}

impl GeneSpace {
    pub fn new(bounds: &CandidateBounds, catalog_len: usize) -> Self {
        Self {
            bounds: bounds.gene_bounds(catalog_len),
            candidate_bounds: bounds.clone(),
            catalog_len,
        }
    }

    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    pub fn bounds(&self) -> &[(f64, f64)] {
        &self.bounds
    }

    /// Position of the wire index gene.
    pub fn wire_gene(&self) -> usize {
        self.bounds.len() - 1
    }

    pub fn catalog_len(&self) -> usize {
        self.catalog_len
    }

    /// Clamp continuous genes into bounds; round and clamp the wire gene.
    pub fn clamp(&self, genes: &mut [f64]) {
        let wire = self.wire_gene();
        for (i, (gene, &bound)) in genes.iter_mut().zip(&self.bounds).enumerate() {
            *gene = if i == wire {
                clamp_wire_index(*gene, self.catalog_len) as f64
            } else {
                clamp_to(*gene, bound)
            };
        }
    }

    /// Continuous genes uniform in bounds, wire index uniform over the catalog.
    pub fn random_genes(&self, rng: &mut GenomeRng) -> Vec<f64> {
        let wire = self.wire_gene();
        self.bounds
            .iter()
            .enumerate()
            .map(|(i, &bound)| {
                if i == wire {
                    rng.index(self.catalog_len) as f64
                } else {
                    rng.uniform(bound)
                }
            })
            .collect()
    }

    pub fn to_candidate(&self, genes: &[f64]) -> Candidate {
        Candidate::from_genes(genes, &self.candidate_bounds, self.catalog_len)
    }

    pub fn candidate_bounds(&self) -> &CandidateBounds {
        &self.candidate_bounds
    }
}

/// Mean per-gene distance normalized by each gene's span.
pub fn genome_distance(a: &[f64], b: &[f64], space: &GeneSpace) -> f64 {
    let terms: Vec<f64> = a
        .iter()
        .zip(b)
        .zip(space.bounds())
        .map(|((x, y), (lo, hi))| {
            let span = hi - lo;
            if span > 0.0 { (x - y).abs() / span } else { 0.0 }
        })
        .collect();

    if terms.is_empty() {
        0.0
    } else {
        terms.iter().sum::<f64>() / terms.len() as f64
    }
}
