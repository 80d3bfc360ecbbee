// Domain layer: models and ports shared by the three jobs.

pub mod model;
pub mod ports;
