// Domain layer: models, code tables and ports (interfaces).

pub mod codes;
pub mod model;
pub mod ports;
