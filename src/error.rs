//! Error types

use crate::binary::read::ReadEof;
use std::fmt;

/// Errors that originate when parsing binary data
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum ParseError {
    BadEof,
    BadValue,
    BadVersion,
    BadOffset,
    BadIndex,
    LimitExceeded,
    MissingValue,
    NotImplemented,
}

impl From<ReadEof> for ParseError {
    fn from(_error: ReadEof) -> Self {
        ParseError::BadEof
    }
}

impl From<std::num::TryFromIntError> for ParseError {
    fn from(_error: std::num::TryFromIntError) -> Self {
        ParseError::BadValue
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::BadEof => write!(f, "end of data reached unexpectedly"),
            ParseError::BadValue => write!(f, "invalid value"),
            ParseError::BadVersion => write!(f, "unexpected data version"),
            ParseError::BadOffset => write!(f, "invalid data offset"),
            ParseError::BadIndex => write!(f, "invalid data index"),
            ParseError::LimitExceeded => write!(f, "limit exceeded"),
            ParseError::MissingValue => write!(f, "an expected data value was missing"),
            ParseError::NotImplemented => write!(f, "feature not implemented"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Errors that originate when interpreting a charstring program.
///
/// All of these are fatal for the glyph being interpreted but not for the font.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum CharStringError {
    ParseError(ParseError),
    UnknownOperator(u16),
    StackUnderflow,
    StackOverflow,
    SubroutineStackOverflow,
    SubroutineNotFound,
    NoLocalSubroutines,
    InvalidArgumentsStackLength,
    InvalidSeacCode,
}

impl From<ParseError> for CharStringError {
    fn from(error: ParseError) -> Self {
        CharStringError::ParseError(error)
    }
}

impl fmt::Display for CharStringError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CharStringError::ParseError(err) => write!(f, "parse error: {}", err),
            CharStringError::UnknownOperator(op) => {
                if op >> 8 == 12 {
                    write!(f, "unknown operator 12 {}", op & 0xFF)
                } else {
                    write!(f, "unknown operator {}", op)
                }
            }
            CharStringError::StackUnderflow => write!(f, "operand stack underflow"),
            CharStringError::StackOverflow => write!(f, "operand stack limit reached"),
            CharStringError::SubroutineStackOverflow => {
                write!(f, "subroutine nesting limit reached")
            }
            CharStringError::SubroutineNotFound => write!(f, "subroutine index out of range"),
            CharStringError::NoLocalSubroutines => write!(f, "no local subroutines"),
            CharStringError::InvalidArgumentsStackLength => {
                write!(f, "an invalid amount of items are in an arguments stack")
            }
            CharStringError::InvalidSeacCode => write!(f, "invalid seac code"),
        }
    }
}

impl std::error::Error for CharStringError {}

/// Errors that originate when writing binary data
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum WriteError {
    BadValue,
    NotImplemented,
    PlaceholderMismatch,
}

impl From<std::num::TryFromIntError> for WriteError {
    fn from(_error: std::num::TryFromIntError) -> Self {
        WriteError::BadValue
    }
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteError::BadValue => write!(f, "write: bad value"),
            WriteError::NotImplemented => write!(f, "writing in this format is not implemented"),
            WriteError::PlaceholderMismatch => {
                write!(f, "data written to placeholder did not match expected size")
            }
        }
    }
}

impl std::error::Error for WriteError {}

/// Enum that can hold read (`ParseError`), interpretation and write errors
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum ReadWriteError {
    Read(ParseError),
    Write(WriteError),
    CharString(CharStringError),
    /// Processing was cancelled between glyphs.
    Cancelled,
}

impl From<ParseError> for ReadWriteError {
    fn from(error: ParseError) -> Self {
        ReadWriteError::Read(error)
    }
}

impl From<WriteError> for ReadWriteError {
    fn from(error: WriteError) -> Self {
        ReadWriteError::Write(error)
    }
}

impl From<CharStringError> for ReadWriteError {
    fn from(error: CharStringError) -> Self {
        ReadWriteError::CharString(error)
    }
}

impl fmt::Display for ReadWriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadWriteError::Read(err) => write!(f, "read error: {}", err),
            ReadWriteError::Write(err) => write!(f, "write error: {}", err),
            ReadWriteError::CharString(err) => write!(f, "charstring error: {}", err),
            ReadWriteError::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::error::Error for ReadWriteError {}
