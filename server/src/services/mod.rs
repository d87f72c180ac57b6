pub mod feed_loader;
pub mod location_loader;
