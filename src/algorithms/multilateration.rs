//! Linearized least-squares multilateration
//!
//! Every range defines a sphere around its anchor. Subtracting the sphere of
//! a reference anchor from each of the others removes the common
//! `x² + y² + z²` term and leaves one linear equation per extra anchor:
//!
//! ```text
//! 2(xi-xr)x + 2(yi-yr)y + 2(zi-zr)z = dr² - di² - |pr|² + |pi|²
//! ```
//!
//! The stacked system is solved by SVD, which yields the minimum-norm least
//! squares solution and exposes the numerical rank so degenerate anchor
//! layouts can be rejected instead of producing a spurious position.

use crate::core::{
    AnchorRegistry, Fix, Measurement, NoFixReason, Point3, PositionEstimate, Solution,
    MIN_ANCHORS_3D,
};
use nalgebra::{DMatrix, DVector};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Multilateration solver over a fixed anchor registry
#[derive(Debug, Clone)]
pub struct MultilaterationSolver {
    /// Singular values below `rank_tolerance * sigma_max` count as zero
    rank_tolerance: f64,
}

impl Default for MultilaterationSolver {
    fn default() -> Self {
        Self {
            rank_tolerance: 1e-9,
        }
    }
}

impl MultilaterationSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rank_tolerance(mut self, tolerance: f64) -> Self {
        self.rank_tolerance = tolerance.abs();
        self
    }

    pub fn rank_tolerance(&self) -> f64 {
        self.rank_tolerance
    }

    /// Solve one measurement and wrap the outcome with its source
    pub fn estimate(&self, measurement: Measurement, registry: &AnchorRegistry) -> PositionEstimate {
        let fix = self.solve(&measurement.ranges, registry);
        match &fix {
            Fix::Position(solution) => debug!(
                tag = %measurement.tag_id,
                x = solution.position.x,
                y = solution.position.y,
                z = solution.position.z,
                residual = solution.residual_rms,
                "position fix"
            ),
            Fix::NoFix(reason) => debug!(tag = %measurement.tag_id, %reason, "no fix"),
        }

        PositionEstimate {
            tag_id: measurement.tag_id.clone(),
            fix,
            source: measurement,
        }
    }

    /// Solve a set of anchor ranges
    ///
    /// Ranges whose anchor is unknown, or whose distance is negative or not
    /// finite, are ignored. The reference anchor is the smallest usable id.
    pub fn solve(&self, ranges: &BTreeMap<String, f64>, registry: &AnchorRegistry) -> Fix {
        // BTreeMap order makes the first usable entry the reference anchor
        let usable: Vec<(Point3, f64)> = ranges
            .iter()
            .filter(|(_, d)| d.is_finite() && **d >= 0.0)
            .filter_map(|(id, d)| registry.get(id).map(|pos| (*pos, *d)))
            .collect();

        if usable.len() < MIN_ANCHORS_3D {
            return Fix::NoFix(NoFixReason::InsufficientAnchors {
                usable: usable.len(),
                required: MIN_ANCHORS_3D,
            });
        }

        let (a, b) = Self::linear_system(&usable);

        let svd = a.clone().svd(true, true);
        let sigma_max = svd.singular_values.max();
        let eps = self.rank_tolerance * sigma_max;
        let rank = if sigma_max > 0.0 { svd.rank(eps) } else { 0 };
        trace!(rank, sigma_max, "multilateration system");

        if rank < 3 {
            return Fix::NoFix(NoFixReason::DegenerateGeometry { rank });
        }

        let p = match svd.solve(&b, eps) {
            Ok(p) => p,
            Err(e) => {
                debug!(error = e, "svd solve failed");
                return Fix::NoFix(NoFixReason::DegenerateGeometry { rank });
            }
        };

        let position = Point3::new(p[0], p[1], p[2]);
        if !position.iter().all(|c| c.is_finite()) {
            return Fix::NoFix(NoFixReason::NonFinite);
        }

        let residual = &a * &p - &b;
        let residual_rms = residual.norm() / (residual.len() as f64).sqrt();

        Fix::Position(Solution {
            position,
            residual_rms,
            anchors_used: usable.len(),
        })
    }

    /// Build `A·p = b` against the first entry as reference
    fn linear_system(usable: &[(Point3, f64)]) -> (DMatrix<f64>, DVector<f64>) {
        let (pr, dr) = usable[0];
        let rows = usable.len() - 1;
        let mut a = DMatrix::zeros(rows, 3);
        let mut b = DVector::zeros(rows);

        for (row, (pi, di)) in usable[1..].iter().enumerate() {
            a[(row, 0)] = 2.0 * (pi.x - pr.x);
            a[(row, 1)] = 2.0 * (pi.y - pr.y);
            a[(row, 2)] = 2.0 * (pi.z - pr.z);

            b[row] = dr * dr - di * di - pr.norm_squared() + pi.norm_squared();
        }

        (a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Anchor;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    fn exact_ranges(registry: &AnchorRegistry, truth: &Point3) -> BTreeMap<String, f64> {
        registry
            .iter()
            .map(|(id, pos)| (id.to_string(), (truth - pos).norm()))
            .collect()
    }

    #[test]
    fn test_reference_room_exact_recovery() {
        let registry = AnchorRegistry::reference_room();
        let truth = Point3::new(4.0, 3.0, 1.5);
        let ranges = exact_ranges(&registry, &truth);

        let fix = MultilaterationSolver::new().solve(&ranges, &registry);
        let position = fix.position().expect("expected a fix");

        println!(
            "Recovered position: x={:.9}, y={:.9}, z={:.9}",
            position.x, position.y, position.z
        );
        assert!((position - truth).norm() < 1e-6);
    }

    #[test]
    fn test_exact_recovery_at_several_positions() {
        let registry = AnchorRegistry::reference_room();
        let solver = MultilaterationSolver::new();

        for truth in [
            Point3::new(1.0, 1.0, 0.5),
            Point3::new(7.5, 5.5, 2.9),
            Point3::new(-3.0, 10.0, 4.0),
            Point3::new(0.0, 0.0, 0.0),
        ] {
            let ranges = exact_ranges(&registry, &truth);
            let position = solver.solve(&ranges, &registry).position().unwrap();
            assert!((position - truth).norm() < 1e-6, "failed for {:?}", truth);
        }
    }

    #[test]
    fn test_overdetermined_exact_recovery() {
        let registry = AnchorRegistry::new(vec![
            Anchor::new("A1", 0.0, 0.0, 0.0),
            Anchor::new("A2", 10.0, 0.0, 0.5),
            Anchor::new("A3", 0.0, 10.0, 1.0),
            Anchor::new("A4", 10.0, 10.0, 3.0),
            Anchor::new("A5", 5.0, 5.0, 4.0),
            Anchor::new("A6", 2.0, 8.0, 2.5),
        ])
        .unwrap();
        let truth = Point3::new(3.2, 6.7, 1.1);
        let ranges = exact_ranges(&registry, &truth);

        match MultilaterationSolver::new().solve(&ranges, &registry) {
            Fix::Position(solution) => {
                assert_eq!(solution.anchors_used, 6);
                assert!((solution.position - truth).norm() < 1e-6);
                assert!(solution.residual_rms < 1e-6);
            }
            Fix::NoFix(reason) => panic!("unexpected no-fix: {}", reason),
        }
    }

    #[test]
    fn test_noisy_overdetermined_solution_near_truth() {
        let registry = AnchorRegistry::new(vec![
            Anchor::new("A1", 0.0, 0.0, 0.0),
            Anchor::new("A2", 10.0, 0.0, 0.0),
            Anchor::new("A3", 0.0, 10.0, 0.0),
            Anchor::new("A4", 10.0, 10.0, 0.0),
            Anchor::new("A5", 0.0, 0.0, 5.0),
            Anchor::new("A6", 10.0, 0.0, 5.0),
            Anchor::new("A7", 0.0, 10.0, 5.0),
            Anchor::new("A8", 10.0, 10.0, 5.0),
        ])
        .unwrap();
        let truth = Point3::new(4.0, 6.0, 2.0);
        let mut rng = StdRng::seed_from_u64(7);
        let noise = Normal::new(0.0, 0.05).unwrap();
        let solver = MultilaterationSolver::new();

        let mut total_error = 0.0;
        let trials = 200;
        for _ in 0..trials {
            let ranges: BTreeMap<String, f64> = registry
                .iter()
                .map(|(id, pos)| (id.to_string(), (truth - pos).norm() + noise.sample(&mut rng)))
                .collect();
            let position = solver.solve(&ranges, &registry).position().unwrap();
            total_error += (position - truth).norm();
        }

        let mean_error = total_error / trials as f64;
        println!("Mean error with 8 anchors and 5 cm noise: {:.4} m", mean_error);
        assert!(mean_error < 0.3);
    }

    #[test]
    fn test_insufficient_anchors_is_no_fix() {
        let registry = AnchorRegistry::reference_room();
        let solver = MultilaterationSolver::new();
        let truth = Point3::new(4.0, 3.0, 1.5);
        let all = exact_ranges(&registry, &truth);

        for keep in 0..4 {
            let ranges: BTreeMap<String, f64> = all.clone().into_iter().take(keep).collect();
            assert_eq!(
                solver.solve(&ranges, &registry),
                Fix::NoFix(NoFixReason::InsufficientAnchors {
                    usable: keep,
                    required: 4
                })
            );
        }
    }

    #[test]
    fn test_unknown_anchors_do_not_count() {
        let registry = AnchorRegistry::reference_room();
        let solver = MultilaterationSolver::new();
        let truth = Point3::new(2.0, 2.0, 1.0);

        let mut ranges = exact_ranges(&registry, &truth);
        ranges.remove("A4");
        ranges.insert("X9".to_string(), 3.0);
        ranges.insert("X10".to_string(), 4.0);

        assert!(!solver.solve(&ranges, &registry).is_fix());

        // Unknown extras alongside four known anchors are ignored
        let mut ranges = exact_ranges(&registry, &truth);
        ranges.insert("ZZ".to_string(), 100.0);
        let position = solver.solve(&ranges, &registry).position().unwrap();
        assert!((position - truth).norm() < 1e-6);
    }

    #[test]
    fn test_invalid_distances_are_unusable() {
        let registry = AnchorRegistry::reference_room();
        let mut ranges = exact_ranges(&registry, &Point3::new(4.0, 3.0, 1.5));
        ranges.insert("A2".to_string(), f64::NAN);

        let fix = MultilaterationSolver::new().solve(&ranges, &registry);
        assert_eq!(
            fix,
            Fix::NoFix(NoFixReason::InsufficientAnchors {
                usable: 3,
                required: 4
            })
        );

        ranges.insert("A2".to_string(), -1.0);
        assert!(!MultilaterationSolver::new().solve(&ranges, &registry).is_fix());
    }

    #[test]
    fn test_collinear_anchors_are_no_fix() {
        let registry = AnchorRegistry::new(vec![
            Anchor::new("A1", 0.0, 0.0, 0.0),
            Anchor::new("A2", 1.0, 1.0, 1.0),
            Anchor::new("A3", 2.0, 2.0, 2.0),
            Anchor::new("A4", 3.0, 3.0, 3.0),
        ])
        .unwrap();
        let truth = Point3::new(1.0, 2.0, 0.5);
        let ranges = exact_ranges(&registry, &truth);

        let fix = MultilaterationSolver::new().solve(&ranges, &registry);
        assert!(matches!(
            fix,
            Fix::NoFix(NoFixReason::DegenerateGeometry { rank: 1 })
        ));
    }

    #[test]
    fn test_coplanar_anchors_are_no_fix() {
        let registry = AnchorRegistry::new(vec![
            Anchor::new("A1", 0.0, 0.0, 0.0),
            Anchor::new("A2", 8.0, 0.0, 0.0),
            Anchor::new("A3", 0.0, 6.0, 0.0),
            Anchor::new("A4", 8.0, 6.0, 0.0),
        ])
        .unwrap();
        let ranges = exact_ranges(&registry, &Point3::new(3.0, 3.0, 1.0));

        let fix = MultilaterationSolver::new().solve(&ranges, &registry);
        assert!(matches!(
            fix,
            Fix::NoFix(NoFixReason::DegenerateGeometry { rank: 2 })
        ));
    }

    #[test]
    fn test_reference_choice_does_not_depend_on_insertion_order() {
        let registry = AnchorRegistry::reference_room();
        let solver = MultilaterationSolver::new();
        let truth = Point3::new(5.0, 2.0, 1.0);

        let mut forward = BTreeMap::new();
        let mut backward = BTreeMap::new();
        let ranges: Vec<(String, f64)> = registry
            .iter()
            .map(|(id, pos)| (id.to_string(), (truth - pos).norm() + 0.03))
            .collect();
        for (id, d) in ranges.iter() {
            forward.insert(id.clone(), *d);
        }
        for (id, d) in ranges.iter().rev() {
            backward.insert(id.clone(), *d);
        }

        assert_eq!(solver.solve(&forward, &registry), solver.solve(&backward, &registry));
    }

    #[test]
    fn test_estimate_keeps_source_measurement() {
        let registry = AnchorRegistry::reference_room();
        let truth = Point3::new(4.0, 3.0, 1.5);
        let mut measurement = Measurement::new("T1", 42).with_true_position(truth);
        for (id, pos) in registry.iter() {
            measurement = measurement.with_range(id, (truth - pos).norm());
        }

        let estimate = MultilaterationSolver::new().estimate(measurement.clone(), &registry);
        assert_eq!(estimate.tag_id, "T1");
        assert_eq!(estimate.source, measurement);
        assert!((estimate.position().unwrap() - truth).norm() < 1e-6);
    }
}
