pub mod classifier;
pub mod gray_image;
pub mod histogram;
pub mod laplacian;
