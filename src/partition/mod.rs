pub mod locator;
pub mod time;
