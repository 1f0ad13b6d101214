// Domain layer: pairing models and ports (interfaces). No transport or storage details here.

pub mod model;
pub mod ports;
