use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrakeError {
    #[error("unknown brake system type {0:?}")]
    UnknownBrakeSystem(String),

    #[error("cannot read {what} from {text:?}")]
    BadValue {
        what: &'static str,
        text: String,
    },

    #[error("unknown unit {unit:?} for {what}")]
    BadUnit {
        what: &'static str,
        unit: String,
    },
}

pub type BrakeResult<T> = Result<T, BrakeError>;
