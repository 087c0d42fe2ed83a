//! likelihood::models — the model collaborator trait and ready-made models.
pub mod generator;
pub mod traits;

pub use self::generator::{GeneratorModel, TimeVaryingModel};
pub use self::traits::AggregatedKineticModel;
