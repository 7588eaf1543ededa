use tb_brakes::BrakeError;
use tb_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrainError {
    #[error("a train needs at least one car")]
    EmptyTrain,

    #[error("lead index {index} is outside a train of {len} cars")]
    LeadOutOfRange {
        index: usize,
        len:   usize,
    },

    #[error("car at index {0} is not a locomotive and cannot lead")]
    NotALocomotive(usize),

    #[error("cannot uncouple at {at} from a train of {len} cars")]
    BadUncouple {
        at:  usize,
        len: usize,
    },

    #[error("uncoupling at {at} would detach the lead locomotive at {lead}")]
    LeadDetached {
        at:   usize,
        lead: usize,
    },

    #[error("{what} length {got} does not match car count {expected}")]
    CarCountMismatch {
        expected: usize,
        got:      usize,
        what:     &'static str,
    },

    #[error(transparent)]
    Brake(#[from] BrakeError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type TrainResult<T> = Result<T, TrainError>;
