// Services module - upstream client and SkyHook mapping

pub mod skyhook;
pub mod tmdb;
