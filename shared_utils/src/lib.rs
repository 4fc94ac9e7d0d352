//! Shared Utilities for the img-pyramid tools
//!
//! This crate provides the plumbing the pyramid converter builds on:
//! - External tool locations and process-wide defaults
//! - Logging and external command execution
//! - Path validation for arguments handed to the image engines
//! - ICC profile inspection
//! - Batch processing, progress bars and summary reports

pub mod batch;
pub mod error_handler;
pub mod icc_profile;
pub mod logging;
pub mod path_safety;
pub mod path_validator;
pub mod progress;
pub mod report;
pub mod sizing;
pub mod tools;

pub use batch::*;
pub use error_handler::{error_chain, install_panic_handler, report_error};
pub use icc_profile::{profile_description, read_profile_description};
pub use logging::{
    execute_external_command, execute_external_command_with_env, init_logging,
    log_operation_end, ExternalCommandResult, LogConfig,
};
pub use path_safety::{first_frame_arg, safe_path_arg, with_save_options};
pub use path_validator::{
    check_input_output_conflict, validate_path, validate_paths, PathValidationError,
};
pub use progress::{create_progress_bar, format_bytes, format_duration};
pub use report::print_summary_report;
pub use sizing::{thumbnail_size_by_long_side, SizeError};
pub use tools::*;
