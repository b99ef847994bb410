pub mod analysis;
pub mod comments;
pub mod info;
pub mod panels;
