// Domain models and request bodies

pub mod account;
pub mod session;
pub mod template;
pub mod validation;

pub use account::*;
pub use session::*;
pub use template::*;
pub use validation::*;
