//! Image deployment

pub mod boot;
pub mod image;

pub use boot::{boot_plan, set_boot_order};
pub use image::copy_primary_image;
