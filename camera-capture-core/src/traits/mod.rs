pub mod camera_driver;
pub mod camera_observer;
pub mod preview_surface;
pub mod settings_store;
