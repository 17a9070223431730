pub mod extraction;
pub mod record;
pub mod tenant;
