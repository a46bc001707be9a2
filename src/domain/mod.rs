// Domain layer: models, message vocabulary and ports (interfaces).

pub mod message;
pub mod model;
pub mod ports;
