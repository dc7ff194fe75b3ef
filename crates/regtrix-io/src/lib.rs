pub mod applywarp;
pub mod image_ops;
pub mod matrix_io;
pub mod nifti_io;

pub use applywarp::FslApplyWarp;
pub use image_ops::{apply_to_grid, apply_to_image};
pub use matrix_io::{read_affine, read_affine_series, read_matrix, read_matrix_dir, write_affine_series, write_matrix};
pub use nifti_io::{read_displacement_field, read_grid, read_image, write_displacement_field, write_image};
