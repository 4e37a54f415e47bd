//! Instanced grass field.
//!
//! One draw batch covers every blade. Slots are allocated up front with
//! collapsed placeholders, filled by a seeded [`Placer`], then marked static.
//! The per-frame update keeps a CPU mirror of the instance buffer in step
//! with the logical transforms and bumps a revision whenever it changes.

pub mod field;
pub mod placement;
pub mod uniforms;

pub use field::{FieldError, GrassField, GrassInstance, InstanceUsage};
pub use placement::{Placer, circle_point};
pub use uniforms::{GrassUniforms, GrassUniformsRaw, InstanceRaw};

pub fn crate_info() -> &'static str {
    "meadow-field v0.1.0"
}
