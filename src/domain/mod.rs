// Domain layer: typed model, payload normalization and ports (interfaces).

pub mod model;
pub mod normalize;
pub mod ports;
