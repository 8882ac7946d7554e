pub mod appearance_settings;
pub mod window_settings;
