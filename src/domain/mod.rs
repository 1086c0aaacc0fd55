pub mod asset;
pub mod lookup;
pub mod market;
pub mod order;
pub mod state;

pub use asset::*;
pub use lookup::*;
pub use market::*;
pub use order::*;
pub use state::*;
