mod car;
mod customer;
mod input;
mod rental;

pub use car::*;
pub use customer::*;
pub use input::*;
pub use rental::*;
