//! SQL statement construction: identifiers quoted per backend, values bound as parameters.

mod builder;
pub use builder::*;
