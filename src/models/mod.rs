pub mod country;
pub mod filters;
pub mod game;
pub mod pagination;
pub mod price;
pub mod scoring;

pub use country::*;
pub use filters::*;
pub use game::*;
pub use pagination::*;
pub use price::*;
pub use scoring::*;
