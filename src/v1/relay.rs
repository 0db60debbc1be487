#![forbid(unsafe_code)]

pub mod api_data;
pub mod clear_data;
pub mod index;
pub mod receive;
pub mod version;
pub mod view_data;
