pub mod states;
pub mod params;
pub mod goals;
pub mod binders;
pub mod integrator;
pub mod engine;
pub mod interaction;
pub mod display;
pub mod background;
pub mod scenario;
