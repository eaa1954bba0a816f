mod collection;
mod lookup;
mod parameter;

pub use collection::*;
pub use lookup::*;
pub use parameter::*;
