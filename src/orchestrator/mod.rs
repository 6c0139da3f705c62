//! Sweep orchestration: the coordinator state machine and the service that
//! drives it.

pub mod args;
mod coordinator;
pub mod events;
mod request;
pub mod resource;
pub mod scheduler;
mod service;

pub use coordinator::SweepCoordinator;
pub use events::EventBus;
pub use request::SweepRequest;
pub use resource::HardwareResource;
pub use scheduler::{Scheduler, TimerHandle, TimerKind};
pub use service::SweepService;
