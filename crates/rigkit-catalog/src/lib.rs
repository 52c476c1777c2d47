//! Discovery and registration of rig components for Rigkit.
//!
//! Components are `.rig` files below a rigs directory. Their dotted names
//! mirror the directory nesting (`limbs/arm.rig` is `limbs.arm`). The
//! [`Registry`] collects the built-in library and any external feature sets
//! into one catalog consulted by the rig generator and the properties UI.

mod collection;
mod config;
mod error;
mod feature_set;
mod module;
mod name;
mod registry;
mod walk;

pub use collection::*;
pub use config::*;
pub use error::*;
pub use feature_set::*;
pub use module::*;
pub use name::*;
pub use registry::*;
pub use walk::*;
