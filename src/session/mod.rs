pub mod record;
pub mod state;
pub mod timer;
pub mod tracker;
