pub mod scan;
pub mod settings;
pub mod status;
