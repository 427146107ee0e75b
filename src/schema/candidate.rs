//! Candidate motor designs and their parameter bounds.

use serde::{Deserialize, Serialize};

/// One proposed motor design.
///
/// Dimensions are in millimeters. The wire gauge is an index into the run's
/// wire catalog, never a raw diameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Radial thickness of each coil slot.
    pub slot_thickness: f64,
    /// Axial length of each coil slot.
    pub slot_axial_length: f64,
    /// Axial spacing between neighbouring slots.
    pub slot_axial_spacing: f64,
    /// Back-iron (yoke) thickness, when the run evolves it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back_iron_thickness: Option<f64>,
    /// Index into the wire catalog.
    pub wire_index: usize,
}

impl Candidate {
    /// Flatten into the gene vector used by variation operators.
    ///
    /// Layout: thickness, length, spacing, [back iron], wire index.
    pub fn to_genes(&self) -> Vec<f64> {
        let mut genes = vec![
            self.slot_thickness,
            self.slot_axial_length,
            self.slot_axial_spacing,
        ];
        if let Some(back_iron) = self.back_iron_thickness {
            genes.push(back_iron);
        }
        genes.push(self.wire_index as f64);
        genes
    }

    /// Rebuild a candidate from genes, clamping every field into its bound.
    ///
    /// The wire gene is rounded to the nearest integer before clamping, so a
    /// fractional or out-of-range value can never reach the catalog.
    pub fn from_genes(genes: &[f64], bounds: &CandidateBounds, catalog_len: usize) -> Self {
        let gene = |i: usize| genes.get(i).copied().unwrap_or(f64::NAN);
        let has_back_iron = bounds.back_iron_thickness.is_some();
        let wire_gene = if has_back_iron { gene(4) } else { gene(3) };

        Self {
            slot_thickness: clamp_to(gene(0), bounds.slot_thickness),
            slot_axial_length: clamp_to(gene(1), bounds.slot_axial_length),
            slot_axial_spacing: clamp_to(gene(2), bounds.slot_axial_spacing),
            back_iron_thickness: bounds.back_iron_thickness.map(|b| clamp_to(gene(3), b)),
            wire_index: clamp_wire_index(wire_gene, catalog_len),
        }
    }

    /// Resolve against the wire catalog into simulator input.
    pub fn parameters(&self, wire_catalog: &[f64]) -> MotorParameters {
        let index = self.wire_index.min(wire_catalog.len().saturating_sub(1));
        MotorParameters {
            slot_thickness: self.slot_thickness,
            slot_axial_length: self.slot_axial_length,
            slot_axial_spacing: self.slot_axial_spacing,
            back_iron_thickness: self.back_iron_thickness,
            wire_diameter: wire_catalog.get(index).copied().unwrap_or(0.0),
        }
    }

    /// Check every field against its bound.
    pub fn is_within(&self, bounds: &CandidateBounds, catalog_len: usize) -> bool {
        let inside = |v: f64, (lo, hi): (f64, f64)| v >= lo && v <= hi;
        let back_iron_ok = match (self.back_iron_thickness, bounds.back_iron_thickness) {
            (Some(v), Some(b)) => inside(v, b),
            (None, None) => true,
            _ => false,
        };
        inside(self.slot_thickness, bounds.slot_thickness)
            && inside(self.slot_axial_length, bounds.slot_axial_length)
            && inside(self.slot_axial_spacing, bounds.slot_axial_spacing)
            && back_iron_ok
            && self.wire_index < catalog_len
    }
}

/// Candidate resolved into physical simulator input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotorParameters {
    pub slot_thickness: f64,
    pub slot_axial_length: f64,
    pub slot_axial_spacing: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back_iron_thickness: Option<f64>,
    /// Wire diameter (mm).
    pub wire_diameter: f64,
}

impl std::fmt::Display for MotorParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "thickness={:.3} length={:.3} spacing={:.3}",
            self.slot_thickness, self.slot_axial_length, self.slot_axial_spacing
        )?;
        if let Some(back_iron) = self.back_iron_thickness {
            write!(f, " back_iron={:.3}", back_iron)?;
        }
        write!(f, " wire={:.3}mm", self.wire_diameter)
    }
}

/// Closed bound intervals for every continuous candidate field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateBounds {
    #[serde(default = "default_thickness_bounds")]
    pub slot_thickness: (f64, f64),
    #[serde(default = "default_length_bounds")]
    pub slot_axial_length: (f64, f64),
    #[serde(default = "default_spacing_bounds")]
    pub slot_axial_spacing: (f64, f64),
    /// Evolve back-iron thickness only when set.
    #[serde(default = "default_back_iron_bounds")]
    pub back_iron_thickness: Option<(f64, f64)>,
}

impl Default for CandidateBounds {
    fn default() -> Self {
        Self {
            slot_thickness: default_thickness_bounds(),
            slot_axial_length: default_length_bounds(),
            slot_axial_spacing: default_spacing_bounds(),
            back_iron_thickness: default_back_iron_bounds(),
        }
    }
}

fn default_thickness_bounds() -> (f64, f64) {
    (0.2, 10.0)
}
fn default_length_bounds() -> (f64, f64) {
    (0.2, 10.0)
}
fn default_spacing_bounds() -> (f64, f64) {
    (1.2, 10.0)
}
fn default_back_iron_bounds() -> Option<(f64, f64)> {
    Some((0.2, 10.0))
}

impl CandidateBounds {
    /// Per-gene bounds in `Candidate::to_genes` layout.
    pub fn gene_bounds(&self, catalog_len: usize) -> Vec<(f64, f64)> {
        let mut bounds = vec![
            self.slot_thickness,
            self.slot_axial_length,
            self.slot_axial_spacing,
        ];
        if let Some(back_iron) = self.back_iron_thickness {
            bounds.push(back_iron);
        }
        bounds.push((0.0, catalog_len.saturating_sub(1) as f64));
        bounds
    }

    /// Clamp `candidate` into these bounds, adding or dropping back iron so
    /// its gene layout matches.
    pub fn conform(&self, candidate: &Candidate, catalog_len: usize) -> Candidate {
        let back_iron = self.back_iron_thickness.map(|bounds| {
            candidate
                .back_iron_thickness
                .unwrap_or(0.5 * (bounds.0 + bounds.1))
        });
        let aligned = Candidate {
            back_iron_thickness: back_iron,
            ..candidate.clone()
        };
        Candidate::from_genes(&aligned.to_genes(), self, catalog_len)
    }

    /// Center of every interval, with the given wire index.
    pub fn midpoint(&self, wire_index: usize) -> Candidate {
        let mid = |(lo, hi): (f64, f64)| 0.5 * (lo + hi);
        Candidate {
            slot_thickness: mid(self.slot_thickness),
            slot_axial_length: mid(self.slot_axial_length),
            slot_axial_spacing: mid(self.slot_axial_spacing),
            back_iron_thickness: self.back_iron_thickness.map(mid),
            wire_index,
        }
    }
}

/// Wire diameters (mm) of the standard catalog, ascending.
pub fn default_wire_catalog() -> Vec<f64> {
    vec![
        0.125, 0.16, 0.2, 0.25, 0.315, 0.4, 0.5, 0.63, 0.8, 1.0, 1.25, 1.6, 2.0, 2.5,
    ]
}

/// Clamp into `[lo, hi]`. NaN maps to the lower bound.
#[inline]
pub fn clamp_to(value: f64, (lo, hi): (f64, f64)) -> f64 {
    if value.is_nan() { lo } else { value.clamp(lo, hi) }
}

/// Round to nearest and clamp into `[0, catalog_len - 1]`.
#[inline]
pub fn clamp_wire_index(value: f64, catalog_len: usize) -> usize {
    let max = catalog_len.saturating_sub(1);
    if value.is_nan() || value <= 0.0 {
        0
    } else {
        (value.round() as usize).min(max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_genes_roundtrip_with_back_iron() {
        let bounds = CandidateBounds::default();
        let candidate = Candidate {
            slot_thickness: 3.0,
            slot_axial_length: 4.0,
            slot_axial_spacing: 2.0,
            back_iron_thickness: Some(1.5),
            wire_index: 7,
        };
        let genes = candidate.to_genes();
        assert_eq!(genes.len(), 5);
        assert_eq!(Candidate::from_genes(&genes, &bounds, 14), candidate);
    }

    #[test]
    fn test_genes_without_back_iron() {
        let bounds = CandidateBounds {
            back_iron_thickness: None,
            ..Default::default()
        };
        let candidate = Candidate::from_genes(&[5.0, 5.0, 5.0, 2.6], &bounds, 14);
        assert_eq!(candidate.back_iron_thickness, None);
        assert_eq!(candidate.wire_index, 3);
        assert_eq!(bounds.gene_bounds(14).len(), 4);
    }

    #[test]
    fn test_wire_index_rounding() {
        assert_eq!(clamp_wire_index(2.49, 14), 2);
        assert_eq!(clamp_wire_index(2.5, 14), 3);
        assert_eq!(clamp_wire_index(-3.2, 14), 0);
        assert_eq!(clamp_wire_index(99.0, 14), 13);
        assert_eq!(clamp_wire_index(f64::NAN, 14), 0);
    }

    #[test]
    fn test_parameters_use_catalog() {
        let catalog = default_wire_catalog();
        let candidate = CandidateBounds::default().midpoint(9);
        let params = candidate.parameters(&catalog);
        assert_eq!(params.wire_diameter, 1.0);
        assert_eq!(params.slot_thickness, 5.1);
    }

    #[test]
    fn test_conform_adds_back_iron() {
        let bounds = CandidateBounds::default();
        let candidate = Candidate {
            slot_thickness: 50.0,
            slot_axial_length: 4.0,
            slot_axial_spacing: 2.0,
            back_iron_thickness: None,
            wire_index: 40,
        };
        let conformed = bounds.conform(&candidate, 14);
        assert_eq!(conformed.back_iron_thickness, Some(5.1));
        assert_eq!(conformed.slot_thickness, 10.0);
        assert_eq!(conformed.wire_index, 13);
    }

    proptest! {
        #[test]
        fn prop_from_genes_always_within_bounds(
            genes in proptest::collection::vec(-100.0f64..100.0, 5),
        ) {
            let bounds = CandidateBounds::default();
            let candidate = Candidate::from_genes(&genes, &bounds, 14);
            prop_assert!(candidate.is_within(&bounds, 14));
        }
    }
}
