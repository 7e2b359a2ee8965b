//! Kernel intermediate representation.
//!
//! - `arg`: classified argument descriptors
//! - `indirection`: indirect-group and mapping-table canonicalization
//! - `kernel`: kernel descriptors, structural signatures and the builder
//! - `registry`: cross-file kernel, constant and set registries

pub mod arg;
pub mod indirection;
pub mod kernel;
pub mod registry;

pub use arg::{Access, ArgDescriptor, ArgKind, ArgVariant, SoaSource};
pub use indirection::Indirection;
pub use kernel::{BuiltKernel, KernelBuilder, KernelDescriptor, KernelSignature};
pub use registry::{ConstDescriptor, ConstantRegistry, FileId, KernelRegistry, SetDescriptor, SetRegistry};
