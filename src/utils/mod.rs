pub mod text;
pub mod throttle;

pub use throttle::RequestThrottle;
