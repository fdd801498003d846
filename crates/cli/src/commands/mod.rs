pub mod check;
pub mod convert;
pub mod generate;
pub mod servers;
pub mod sync;
