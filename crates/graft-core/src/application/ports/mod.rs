//! Application ports (traits) for external dependencies.
//!
//! In hexagonal architecture, ports define interfaces that the application
//! needs from the outside world. Adapters in `graft-adapters` implement these.
//!
//! ## Port Types
//!
//! - **Driven (Output) Ports**: Called by application, implemented by infrastructure
//!   - `Filesystem`: File operations used by apply
//!   - `GeneratorRegistry`: Generator lookup and listing
//!   - `ProjectLoader`: Reads the project into a snapshot
//!
//! - **Driving (Input) Ports**: Called by external world, implemented by application
//!   - (Defined in CLI layer, implemented by services)

pub mod output;

pub use output::{Filesystem, GeneratorRegistry, ProjectLoader};

#[cfg(test)]
pub use output::{MockFilesystem, MockGeneratorRegistry, MockProjectLoader};
