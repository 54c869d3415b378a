pub mod bar;
pub mod granularity;
pub mod interpolation;
pub mod request_params;
