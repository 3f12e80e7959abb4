pub mod camera_entity;
pub mod image_capturer;
pub mod visca;
