// Domain-layer modules and shared errors/models
pub mod assessment {
    pub use crate::assessment::*;
}

pub mod estimator {
    pub use crate::estimator::*;
}

pub mod scoring {
    pub use crate::scoring::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
