//! Command-line front end listing the rig components Rigkit can find.

mod report;
mod scan;

pub use report::*;
pub use scan::*;
