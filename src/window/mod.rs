pub mod drag;
pub mod events;
pub mod focus;
pub mod frame;
pub mod manager;
pub mod registry;
