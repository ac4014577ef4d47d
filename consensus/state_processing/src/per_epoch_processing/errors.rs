use safe_arith::ArithError;
use types::BeaconStateError;

#[derive(Debug, PartialEq)]
pub enum EpochProcessingError {
    UnableToDetermineProducer,
    NoBlockRoots,
    BaseRewardQuotientIsZero,
    PreviousTotalBalanceIsZero,
    ValidatorStatusesInconsistent,
    DeltasInconsistent,
    DeltaOutOfBounds(usize),
    DeltaOverflow,
    InvalidFlagIndex(usize),
    MissingValidator(usize),
    BeaconStateError(BeaconStateError),
    SszTypesError(ssz_types::Error),
    ArithError(ArithError),
}

impl From<BeaconStateError> for EpochProcessingError {
    fn from(e: BeaconStateError) -> EpochProcessingError {
        EpochProcessingError::BeaconStateError(e)
    }
}

impl From<ssz_types::Error> for EpochProcessingError {
    fn from(e: ssz_types::Error) -> EpochProcessingError {
        EpochProcessingError::SszTypesError(e)
    }
}

impl From<ArithError> for EpochProcessingError {
    fn from(e: ArithError) -> EpochProcessingError {
        EpochProcessingError::ArithError(e)
    }
}
