//! Repository modules

pub mod simulation;
pub mod trades;
pub mod volume;

pub use simulation::SimulationRepository;
pub use trades::TradeRepository;
pub use volume::VolumeRepository;
