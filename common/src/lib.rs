pub mod buffer2;
pub mod file_format;
pub mod log_setup;
pub mod slot;

pub use buffer2::Buffer2;
pub use file_format::{
    deserialize, get_file_extension, serialize, FileExtensionError, SerdeFormat,
    SerdeFormatError, SerdeFormatResult,
};
pub use log_setup::{setup_logging, LogOptions, LogSetupError};
pub use slot::Slot;
