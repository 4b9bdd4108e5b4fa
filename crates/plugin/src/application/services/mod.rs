//! Application services.

mod map_events_service;
mod robot_service;

pub use map_events_service::MapEventsService;
pub use robot_service::Robot;
