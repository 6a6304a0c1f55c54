pub mod cnn;

pub use cnn::*;
