// Domain layer: canonical vocabulary, row/record models and ports.

pub mod field;
pub mod model;
pub mod ports;
