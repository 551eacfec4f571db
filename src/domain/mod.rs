pub mod model;
pub mod ports;
pub mod resource_id;
