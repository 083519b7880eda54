mod error;
mod types;

pub use error::{ImgprobeError, Result};
pub use types::ImageClass;
