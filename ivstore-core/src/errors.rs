use thiserror::Error;

#[derive(Error, Debug)]
pub enum IntervalError {
    #[error("invalid range: begin {begin} is greater than end {end}")]
    InvalidRange { begin: i32, end: i32 },

    #[error("can't parse interval: {0}")]
    Parse(String),
}
