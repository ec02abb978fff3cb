use std::io;
use std::net;

pub type NetworkResult<T> = Result<T, NetworkError>;

/// Transient conditions surface as `Wait`; everything else is fatal to the
/// connection it occurred on.
#[derive(Debug, Eq, PartialEq)]
pub enum NetworkError {
    Wait,
    Fatal(ErrorType),
}

#[derive(Debug, Eq, PartialEq)]
pub enum ErrorType {
    PayloadTooLarge,
    TooManyArgs,
    TruncatedFrame,
    TrailingBytes,
    AddrParse,
    Io(io::ErrorKind),
}

impl From<io::Error> for NetworkError {
    #[inline]
    fn from(io_error: io::Error) -> Self {
        match io_error.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted => NetworkError::Wait,
            kind => NetworkError::Fatal(ErrorType::Io(kind)),
        }
    }
}

impl From<net::AddrParseError> for NetworkError {
    #[inline]
    fn from(_: net::AddrParseError) -> Self {
        NetworkError::Fatal(ErrorType::AddrParse)
    }
}

pub trait ErrorUtils {
    fn has_failed(&self) -> bool;
}

impl<T> ErrorUtils for NetworkResult<T> {
    fn has_failed(&self) -> bool {
        match self {
            Ok(_) => false,
            Err(NetworkError::Wait) => false,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_would_block_folds_to_wait() {
        let err: NetworkError = io::Error::from(io::ErrorKind::WouldBlock).into();
        assert_eq!(err, NetworkError::Wait);

        let err: NetworkError = io::Error::from(io::ErrorKind::Interrupted).into();
        assert_eq!(err, NetworkError::Wait);
    }

    #[test]
    fn test_hard_io_error_is_fatal() {
        let err: NetworkError = io::Error::from(io::ErrorKind::ConnectionReset).into();
        assert_eq!(
            err,
            NetworkError::Fatal(ErrorType::Io(io::ErrorKind::ConnectionReset))
        );
    }

    #[test]
    fn test_has_failed() {
        assert!(!NetworkResult::Ok(()).has_failed());
        assert!(!NetworkResult::<()>::Err(NetworkError::Wait).has_failed());
        assert!(NetworkResult::<()>::Err(NetworkError::Fatal(ErrorType::AddrParse)).has_failed());
    }
}
