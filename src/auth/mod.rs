pub mod gate;
pub mod middleware;


pub use gate::*;
pub use middleware::*;
