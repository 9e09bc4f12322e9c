// Domain-layer engines and shared errors/models
pub mod analytics {
    pub use crate::analytics::*;
}

pub mod query {
    pub use crate::query::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
