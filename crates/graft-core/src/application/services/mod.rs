//! Application services - orchestrate use cases.
//!
//! Services coordinate the domain layer and ports to accomplish
//! high-level use cases like "plan a run" or "apply a change set".

pub mod apply_service;
pub mod generator_service;
pub mod plan_service;

pub use apply_service::{ApplyReport, ApplyService, is_staged_path, staged_path};
pub use generator_service::{GeneratorInfo, GeneratorService};
pub use plan_service::PlanService;
