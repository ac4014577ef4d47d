use ssz::DecodeError;
use types::BeaconStateError;

#[derive(Debug, PartialEq)]
pub enum Error {
    SszDecodeError(DecodeError),
    BeaconStateError(BeaconStateError),
    DBError { message: String },
}

impl From<DecodeError> for Error {
    fn from(e: DecodeError) -> Error {
        Error::SszDecodeError(e)
    }
}

impl From<BeaconStateError> for Error {
    fn from(e: BeaconStateError) -> Error {
        Error::BeaconStateError(e)
    }
}
