pub mod health;
pub mod images;
pub mod library_images;
pub mod project_images;

mod multipart;
