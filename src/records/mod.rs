pub mod popular;

pub use popular::{load_or_default, PopularSymbols};
