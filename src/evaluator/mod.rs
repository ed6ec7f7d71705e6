pub mod alignment;
pub mod params;
pub mod traits;
pub mod types;

pub use alignment::*;
pub use params::*;
pub use traits::*;
pub use types::*;
