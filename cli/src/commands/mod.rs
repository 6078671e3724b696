pub mod check_config;
pub mod decide;
pub mod lookup;
