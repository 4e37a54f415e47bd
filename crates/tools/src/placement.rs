//! Radial distribution of placed blades.

use meadow_field::GrassField;
use serde::Serialize;

/// Number of equal-area rings in [`PlacementStats::ring_histogram`].
pub const RINGS: usize = 8;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlacementStats {
    pub count: usize,
    pub radius: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub mean_distance: f32,
    /// Largest |y| of any placed root; placement keeps roots on the plane.
    pub max_abs_y: f32,
    /// Share of blades in each equal-area ring, inner to outer. A uniform
    /// density gives `1 / RINGS` everywhere.
    pub ring_histogram: [f32; RINGS],
}

impl PlacementStats {
    /// Ratio of the outermost ring's share to the innermost's.
    pub fn rim_bias(&self) -> f32 {
        let inner = self.ring_histogram[0];
        if inner > 0.0 {
            self.ring_histogram[RINGS - 1] / inner
        } else {
            f32::INFINITY
        }
    }
}

/// Measure the placed blades of `field` against the field radius.
pub fn placement_stats(field: &GrassField, radius: f32) -> PlacementStats {
    let placed = &field.instances()[..field.len()];
    let mut stats = PlacementStats {
        count: placed.len(),
        radius,
        min_distance: if placed.is_empty() { 0.0 } else { f32::MAX },
        max_distance: 0.0,
        mean_distance: 0.0,
        max_abs_y: 0.0,
        ring_histogram: [0.0; RINGS],
    };
    if placed.is_empty() || radius <= 0.0 {
        return stats;
    }

    let mut sum = 0.0_f64;
    for blade in placed {
        let p = blade.transform.position;
        let d = (p.x * p.x + p.z * p.z).sqrt();
        stats.min_distance = stats.min_distance.min(d);
        stats.max_distance = stats.max_distance.max(d);
        stats.max_abs_y = stats.max_abs_y.max(p.y.abs());
        sum += f64::from(d);

        let area = (d / radius).powi(2).clamp(0.0, 1.0);
        let ring = ((area * RINGS as f32) as usize).min(RINGS - 1);
        stats.ring_histogram[ring] += 1.0;
    }
    stats.mean_distance = (sum / placed.len() as f64) as f32;
    for share in &mut stats.ring_histogram {
        *share /= placed.len() as f32;
    }
    tracing::debug!(count = stats.count, rim_bias = stats.rim_bias(), "placement measured");
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use meadow_common::{BoundingSphere, GrassConfig, PlacementPolicy};

    fn stats_for(policy: PlacementPolicy) -> PlacementStats {
        let config = GrassConfig {
            count: 4000,
            capacity: 4000,
            placement: policy,
            ..GrassConfig::default()
        };
        let field = GrassField::build(&config, BoundingSphere::new(Vec3::Y, 1.0)).unwrap();
        placement_stats(&field, config.radius)
    }

    #[test]
    fn ring_policy_sits_on_the_rim() {
        let s = stats_for(PlacementPolicy::Ring);
        assert!((s.min_distance - 10.0).abs() < 1e-3);
        assert!((s.max_distance - 10.0).abs() < 1e-3);
        assert_eq!(s.max_abs_y, 0.0);
        assert_eq!(s.ring_histogram[RINGS - 1], 1.0);
    }

    #[test]
    fn projected_sphere_is_rim_heavy() {
        let s = stats_for(PlacementPolicy::ProjectedSphere);
        assert!(s.max_distance <= 10.0 + 1e-3);
        assert!(s.rim_bias() > 2.0);
    }

    #[test]
    fn area_uniform_is_roughly_flat() {
        let s = stats_for(PlacementPolicy::AreaUniform);
        for share in s.ring_histogram {
            assert!((share - 1.0 / RINGS as f32).abs() < 0.04);
        }
    }

    #[test]
    fn serializes_to_json() {
        let s = stats_for(PlacementPolicy::Ring);
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("\"ring_histogram\""));
    }
}
