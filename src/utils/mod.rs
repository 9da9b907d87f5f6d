pub mod time;

pub use time::unix_timestamp;
