//! CAD kernel abstraction

mod implicit;
mod mesher;
mod shape;
mod traits;

pub use implicit::ImplicitKernel;
pub use traits::*;
