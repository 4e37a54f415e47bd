use std::sync::atomic::{AtomicU64, Ordering};

use glam::{Mat4, Vec3};
use meadow_common::{BoundingSphere, GrassConfig, Rgb, Transform};

use crate::placement::Placer;
use crate::uniforms::{GrassUniforms, InstanceRaw};

/// Errors from building or growing the field.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FieldError {
    #[error("grass field is full ({capacity} instances)")]
    CapacityExceeded { capacity: usize },
    #[error("field radius must be positive, got {0}")]
    InvalidRadius(f32),
    #[error("invalid scale range [{min}, {max})")]
    InvalidScaleRange { min: f32, max: f32 },
    #[error("blade mesh has empty bounds")]
    EmptyBounds,
}

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Upload hint for the instance buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceUsage {
    /// Still being filled.
    Dynamic,
    /// Placement finished; contents are expected to stay put.
    Static,
}

/// One blade: logical transform plus colour tag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrassInstance {
    pub transform: Transform,
    pub color: Rgb,
}

/// Fixed-capacity instanced batch of grass blades.
///
/// Slots `0..len` hold placed blades; the rest keep their collapsed
/// placeholder so they rasterize to nothing.
#[derive(Debug, Clone)]
pub struct GrassField {
    instances: Vec<GrassInstance>,
    len: usize,
    raw: Vec<InstanceRaw>,
    usage: InstanceUsage,
    uniforms: GrassUniforms,
    blade_bounds: BoundingSphere,
    bounds: BoundingSphere,
    generation: u64,
    revision: u64,
}

impl GrassField {
    /// Allocate every slot with a collapsed placeholder and a colour tag.
    /// Nothing is placed yet and the buffer is still dynamic.
    pub fn with_placeholders(
        config: &GrassConfig,
        blade_bounds: BoundingSphere,
        placer: &mut Placer,
    ) -> Result<Self, FieldError> {
        if blade_bounds.is_empty() {
            return Err(FieldError::EmptyBounds);
        }
        let instances: Vec<GrassInstance> = (0..config.capacity)
            .map(|_| GrassInstance {
                transform: Transform::collapsed(),
                color: placer.next_color(),
            })
            .collect();
        let raw = instances.iter().map(instance_raw).collect();
        Ok(Self {
            instances,
            len: 0,
            raw,
            usage: InstanceUsage::Dynamic,
            uniforms: GrassUniforms::from_config(config),
            blade_bounds,
            bounds: BoundingSphere::empty(),
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
            revision: 0,
        })
    }

    /// Build the whole field in one batch: placeholders, then placements,
    /// then mark the buffer static.
    pub fn build(config: &GrassConfig, blade_bounds: BoundingSphere) -> Result<Self, FieldError> {
        if config.radius <= 0.0 {
            return Err(FieldError::InvalidRadius(config.radius));
        }
        if config.min_scale < 0.0 || config.max_scale < config.min_scale {
            return Err(FieldError::InvalidScaleRange {
                min: config.min_scale,
                max: config.max_scale,
            });
        }
        if config.count > config.capacity {
            return Err(FieldError::CapacityExceeded {
                capacity: config.capacity,
            });
        }

        let _span = tracing::info_span!("grass_build", count = config.count).entered();
        let mut placer = Placer::new(
            config.placement,
            config.radius,
            (config.min_scale, config.max_scale),
            config.seed,
        );
        let mut field = Self::with_placeholders(config, blade_bounds, &mut placer)?;
        for _ in 0..config.count {
            field.push(placer.next_transform())?;
        }
        field.mark_static();
        field.update(0.0);
        tracing::info!(
            placed = field.len(),
            capacity = field.capacity(),
            policy = ?placer.policy(),
            "grass field built"
        );
        Ok(field)
    }

    /// Place one more blade in the next free slot.
    pub fn push(&mut self, transform: Transform) -> Result<usize, FieldError> {
        if self.len >= self.instances.len() {
            return Err(FieldError::CapacityExceeded {
                capacity: self.instances.len(),
            });
        }
        let slot = self.len;
        self.instances[slot].transform = transform;
        self.len += 1;
        Ok(slot)
    }

    pub fn mark_static(&mut self) {
        self.usage = InstanceUsage::Static;
    }

    /// Per-frame update. Rewrites the instance mirror from the logical
    /// transforms, refreshes the bounds, and sets the time uniform. Returns
    /// whether any instance data changed.
    pub fn update(&mut self, elapsed: f32) -> bool {
        let mut changed = false;
        let mut bounds = BoundingSphere::empty();
        for (instance, raw) in self.instances.iter().zip(self.raw.iter_mut()) {
            let next = instance_raw(instance);
            if *raw != next {
                *raw = next;
                changed = true;
            }
            let matrix = Mat4::from_cols_array_2d(&raw.model);
            bounds = bounds.union(&self.blade_bounds.transformed(&matrix));
        }
        self.bounds = bounds;
        self.uniforms.time = elapsed;
        if changed {
            self.revision += 1;
            tracing::trace!(revision = self.revision, "grass instances changed");
        }
        changed
    }

    pub fn set_player_position(&mut self, position: Vec3) {
        self.uniforms.player_position = position;
    }

    pub fn uniforms(&self) -> &GrassUniforms {
        &self.uniforms
    }

    /// Instance data as it should be uploaded.
    pub fn raw_instances(&self) -> &[InstanceRaw] {
        &self.raw
    }

    pub fn instances(&self) -> &[GrassInstance] {
        &self.instances
    }

    /// Number of placed blades.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.instances.len()
    }

    pub fn usage(&self) -> InstanceUsage {
        self.usage
    }

    /// Unique per allocated field within the process. Revisions are only
    /// comparable between fields of the same generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Bumped every time an update changes instance data.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Bounds in batch-local space.
    pub fn bounds(&self) -> BoundingSphere {
        self.bounds
    }

    /// Bounds after the batch model matrix.
    pub fn world_bounds(&self) -> BoundingSphere {
        self.bounds.transformed(&self.uniforms.model)
    }
}

fn instance_raw(instance: &GrassInstance) -> InstanceRaw {
    let c = instance.color;
    InstanceRaw {
        model: instance.transform.matrix().to_cols_array_2d(),
        color: [c[0], c[1], c[2], 1.0],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meadow_common::PlacementPolicy;

    fn blade_bounds() -> BoundingSphere {
        BoundingSphere::new(Vec3::new(0.0, 1.0, 0.0), 1.0)
    }

    fn small_config(count: usize, capacity: usize) -> GrassConfig {
        GrassConfig {
            count,
            capacity,
            ..GrassConfig::default()
        }
    }

    #[test]
    fn placeholders_come_first_then_static() {
        let config = small_config(10, 16);
        let mut placer = Placer::new(config.placement, 10.0, (0.25, 0.5), 9);
        let field = GrassField::with_placeholders(&config, blade_bounds(), &mut placer).unwrap();
        assert_eq!(field.usage(), InstanceUsage::Dynamic);
        assert_eq!(field.len(), 0);
        assert_eq!(field.capacity(), 16);
        assert!(field.instances().iter().all(|i| i.transform.scale == Vec3::ZERO));

        let built = GrassField::build(&config, blade_bounds()).unwrap();
        assert_eq!(built.usage(), InstanceUsage::Static);
        assert_eq!(built.len(), 10);
        for (slot, instance) in built.instances().iter().enumerate() {
            if slot < 10 {
                assert!(instance.transform.scale.x >= 0.25);
            } else {
                assert_eq!(instance.transform.scale, Vec3::ZERO);
            }
        }
    }

    #[test]
    fn every_slot_gets_a_colour_tag() {
        let field = GrassField::build(&small_config(4, 64), blade_bounds()).unwrap();
        let distinct: std::collections::HashSet<[u32; 3]> = field
            .instances()
            .iter()
            .map(|i| i.color.map(f32::to_bits))
            .collect();
        assert!(distinct.len() > 32);
    }

    #[test]
    fn capacity_is_enforced() {
        let mut field = GrassField::build(&small_config(3, 3), blade_bounds()).unwrap();
        let err = field.push(Transform::default()).unwrap_err();
        assert_eq!(err, FieldError::CapacityExceeded { capacity: 3 });

        let err = GrassField::build(&small_config(5, 3), blade_bounds()).unwrap_err();
        assert_eq!(err, FieldError::CapacityExceeded { capacity: 3 });
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let mut config = small_config(1, 1);
        config.radius = 0.0;
        assert_eq!(
            GrassField::build(&config, blade_bounds()).unwrap_err(),
            FieldError::InvalidRadius(0.0)
        );
        let mut config = small_config(1, 1);
        config.min_scale = 0.6;
        assert!(matches!(
            GrassField::build(&config, blade_bounds()),
            Err(FieldError::InvalidScaleRange { .. })
        ));
        assert_eq!(
            GrassField::build(&small_config(1, 1), BoundingSphere::empty()).unwrap_err(),
            FieldError::EmptyBounds
        );
    }

    #[test]
    fn unchanged_updates_are_bit_identical() {
        let mut field = GrassField::build(&small_config(500, 600), blade_bounds()).unwrap();
        let revision = field.revision();
        let before: Vec<InstanceRaw> = field.raw_instances().to_vec();
        assert!(!field.update(1.0));
        assert!(!field.update(2.0));
        let after = field.raw_instances();
        for (a, b) in before.iter().zip(after) {
            let a_bits = a.model.as_flattened().iter().map(|v| v.to_bits());
            let b_bits = b.model.as_flattened().iter().map(|v| v.to_bits());
            assert!(a_bits.eq(b_bits));
        }
        assert_eq!(field.revision(), revision);
        assert_eq!(field.uniforms().time, 2.0);
    }

    #[test]
    fn rebuilt_field_gets_a_new_generation() {
        let config = small_config(10, 16);
        let first = GrassField::build(&config, blade_bounds()).unwrap();
        let second = GrassField::build(&config, blade_bounds()).unwrap();
        assert_eq!(first.revision(), second.revision());
        assert_ne!(first.generation(), second.generation());
    }

    #[test]
    fn push_bumps_revision_on_next_update() {
        let mut field = GrassField::build(&small_config(2, 4), blade_bounds()).unwrap();
        let revision = field.revision();
        field
            .push(Transform::from_yaw_scale(Vec3::new(3.0, 0.0, 0.0), 0.0, 1.0))
            .unwrap();
        assert!(field.update(0.5));
        assert_eq!(field.revision(), revision + 1);
        assert_eq!(field.len(), 3);
    }

    #[test]
    fn bounds_cover_every_blade() {
        let mut config = small_config(200, 256);
        config.placement = PlacementPolicy::Ring;
        let field = GrassField::build(&config, blade_bounds()).unwrap();
        let bounds = field.bounds();
        for instance in &field.instances()[..field.len()] {
            assert!(bounds.contains_point(instance.transform.position));
        }
        assert!(bounds.radius >= 10.0);
        let world = field.world_bounds();
        assert!((world.center.y - (bounds.center.y - 2.0)).abs() < 1e-4);
    }

    #[test]
    fn player_position_uniform_is_writable() {
        let mut field = GrassField::build(&small_config(1, 1), blade_bounds()).unwrap();
        assert_eq!(field.uniforms().player_position, Vec3::new(0.0, -1.0, 0.0));
        field.set_player_position(Vec3::new(1.0, -1.0, 2.0));
        assert_eq!(field.uniforms().player_position, Vec3::new(1.0, -1.0, 2.0));
    }
}
