pub mod affect;
pub mod appearance;
pub mod crisis;
pub mod message;
pub mod session;
pub mod stream_event;
