mod command_to_string;
mod detect_software;
mod expand_and_resolve_path;
mod sample_name;

pub use command_to_string::command_to_string;
pub use detect_software::check_step_tools;
pub use expand_and_resolve_path::expand_and_resolve_path;
pub use sample_name::sample_name_from_path;
