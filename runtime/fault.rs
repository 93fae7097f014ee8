//! Runtime faults
//!
//! A fault ends the operation that raised it. Fallible operations return [`Result`] and propagate
//! faults with `?`; embedders that need a non-local exit across foreign frames can [`Fault::raise`]
//! and recover it with [`catch_fault`].

use std::panic::{self, UnwindSafe};

use strum::{EnumCount, EnumIter, FromRepr, IntoStaticStr};
use thiserror::Error;

use crate::word::Word;

/// Stable fault codes
///
/// The discriminants are part of the interface with condition reporting and must never be
/// renumbered.
#[repr(u8)]
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, FromRepr, EnumIter, EnumCount, IntoStaticStr,
)]
pub enum FaultCode {
    BadArgumentCount = 1,
    BadMinimumArgumentCount = 2,
    BadArgumentType = 3,
    UnboundVariable = 4,
    BadArgumentTypeNoKeyword = 5,
    OutOfMemory = 6,
    DivisionByZero = 7,
    OutOfRange = 8,
    NotAClosure = 9,
    ContinuationCantReceiveValues = 10,
    BadArgumentTypeCyclicList = 11,
    TooDeepRecursion = 12,
    CantRepresentInexact = 13,
    NotAProperList = 14,
    NoFixnum = 15,
    NoNumber = 16,
    NoString = 17,
    NoPair = 18,
    NoList = 19,
    NoChar = 20,
    NoVector = 21,
    NoSymbol = 22,
    StackOverflow = 23,
    BadStruct = 24,
    NoBytevector = 25,
    LostLocative = 26,
    NoBlock = 27,
    NoNumberVector = 28,
    NoInteger = 29,
    NoUinteger = 30,
    NoPointer = 31,
    NoTaggedPointer = 32,
    NoFlonum = 33,
    NoClosure = 34,
    BadBase = 35,
    CircularData = 36,
    NoBoolean = 37,
    NoLocative = 38,
    NoPort = 39,
    PortDirection = 40,
    PortNoInput = 41,
    PortNoOutput = 42,
    PortClosed = 43,
    AsciizRepresentation = 44,
    MemoryViolation = 45,
    FloatingPointException = 46,
    IllegalInstruction = 47,
    BusError = 48,
    NoExact = 49,
    NoInexact = 50,
    NoReal = 51,
    ComplexNoOrdering = 52,
    NoExactInteger = 53,
    ForeignLimitation = 54,
    ComplexAbs = 55,
    RestArgOutOfBounds = 56,
}

/// Broad class of a fault
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, IntoStaticStr)]
pub enum FaultCategory {
    Arity,
    Type,
    Arithmetic,
    Resource,
    Structural,
    Port,
    Variable,
    Signal,
}

impl FaultCode {
    /// Returns the stable numeric code
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Decodes a stable numeric code
    pub fn from_code(code: u8) -> Option<FaultCode> {
        FaultCode::from_repr(code)
    }

    pub fn category(self) -> FaultCategory {
        use FaultCode::*;

        match self {
            BadArgumentCount | BadMinimumArgumentCount | ContinuationCantReceiveValues
            | RestArgOutOfBounds => FaultCategory::Arity,
            DivisionByZero | CantRepresentInexact | ComplexNoOrdering | ComplexAbs => {
                FaultCategory::Arithmetic
            }
            OutOfMemory | OutOfRange | TooDeepRecursion | StackOverflow | ForeignLimitation => {
                FaultCategory::Resource
            }
            BadArgumentTypeCyclicList | NotAProperList | BadStruct | LostLocative
            | CircularData | AsciizRepresentation => FaultCategory::Structural,
            NoPort | PortDirection | PortNoInput | PortNoOutput | PortClosed => {
                FaultCategory::Port
            }
            UnboundVariable => FaultCategory::Variable,
            MemoryViolation | FloatingPointException | IllegalInstruction | BusError => {
                FaultCategory::Signal
            }
            _ => FaultCategory::Type,
        }
    }

    /// Returns a short human readable description
    pub fn message(self) -> &'static str {
        use FaultCode::*;

        match self {
            BadArgumentCount => "bad argument count",
            BadMinimumArgumentCount => "too few arguments",
            BadArgumentType => "bad argument type",
            UnboundVariable => "unbound variable",
            BadArgumentTypeNoKeyword => "bad argument type - not a keyword",
            OutOfMemory => "not enough memory",
            DivisionByZero => "division by zero",
            OutOfRange => "out of range",
            NotAClosure => "call of non-procedure",
            ContinuationCantReceiveValues => "continuation cannot receive multiple values",
            BadArgumentTypeCyclicList => "bad argument type - cyclic list",
            TooDeepRecursion => "recursion too deep",
            CantRepresentInexact => "inexact number cannot be represented as an exact number",
            NotAProperList => "bad argument type - not a proper list",
            NoFixnum => "bad argument type - not a fixnum",
            NoNumber => "bad argument type - not a number",
            NoString => "bad argument type - not a string",
            NoPair => "bad argument type - not a pair",
            NoList => "bad argument type - not a list",
            NoChar => "bad argument type - not a character",
            NoVector => "bad argument type - not a vector",
            NoSymbol => "bad argument type - not a symbol",
            StackOverflow => "stack overflow",
            BadStruct => "bad argument type - not a structure of the required type",
            NoBytevector => "bad argument type - not a bytevector",
            LostLocative => "locative refers to reclaimed object",
            NoBlock => "bad argument type - not a block object",
            NoNumberVector => "bad argument type - not a number vector",
            NoInteger => "bad argument type - not an integer",
            NoUinteger => "bad argument type - not an unsigned integer",
            NoPointer => "bad argument type - not a pointer",
            NoTaggedPointer => "bad argument type - not a tagged pointer",
            NoFlonum => "bad argument type - not a flonum",
            NoClosure => "bad argument type - not a procedure",
            BadBase => "bad argument type - invalid base",
            CircularData => "recursion too deep or circular data encountered",
            NoBoolean => "bad argument type - not a boolean",
            NoLocative => "bad argument type - not a locative",
            NoPort => "bad argument type - not a port",
            PortDirection => "bad argument type - not a port of the correct type",
            PortNoInput => "bad argument type - not an input port",
            PortNoOutput => "bad argument type - not an output port",
            PortClosed => "port already closed",
            AsciizRepresentation => "cannot represent string with NUL bytes as C string",
            MemoryViolation => "segmentation violation",
            FloatingPointException => "floating point exception",
            IllegalInstruction => "illegal instruction",
            BusError => "bus error",
            NoExact => "bad argument type - not an exact number",
            NoInexact => "bad argument type - not an inexact number",
            NoReal => "bad argument type - not a real",
            ComplexNoOrdering => "bad argument type - complex number has no ordering",
            NoExactInteger => "bad argument type - not an exact integer",
            ForeignLimitation => "number does not fit in foreign type",
            ComplexAbs => "cannot compute absolute value of complex number",
            RestArgOutOfBounds => "attempted rest argument access beyond end of list",
        }
    }
}

/// Fault raised by a runtime operation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("({}) {}", .site.unwrap_or("runtime"), .code.message())]
pub struct Fault {
    code: FaultCode,
    site: Option<&'static str>,
    operands: Vec<Word>,
}

/// Result of a fallible runtime operation
pub type Result<T> = std::result::Result<T, Fault>;

impl Fault {
    /// Creates a fault with no call site or operands
    pub fn new(code: FaultCode) -> Fault {
        Fault {
            code,
            site: None,
            operands: vec![],
        }
    }

    /// Creates a fault tagged with the operation that raised it
    pub fn at(code: FaultCode, site: &'static str) -> Fault {
        Fault {
            code,
            site: Some(site),
            operands: vec![],
        }
    }

    /// Attaches an offending operand
    pub fn with_operand(mut self, operand: Word) -> Fault {
        self.operands.push(operand);
        self
    }

    pub fn code(&self) -> FaultCode {
        self.code
    }

    pub fn site(&self) -> Option<&'static str> {
        self.site
    }

    /// Returns the offending operands
    ///
    /// Pointer operands are only meaningful until the next collection.
    pub fn operands(&self) -> &[Word] {
        &self.operands
    }

    /// Unwinds the current operation with this fault as the payload
    ///
    /// The panic hook is not invoked and no panic message is printed.
    pub fn raise(self) -> ! {
        log::debug!("raising fault {}", self);
        panic::resume_unwind(Box::new(self))
    }
}

/// Runs `f` and recovers any fault it raised
///
/// Panics that are not faults continue unwinding.
pub fn catch_fault<R>(f: impl FnOnce() -> R + UnwindSafe) -> Result<R> {
    match panic::catch_unwind(f) {
        Ok(value) => Ok(value),
        Err(payload) => match payload.downcast::<Fault>() {
            Ok(fault) => Err(*fault),
            Err(other) => panic::resume_unwind(other),
        },
    }
}

/// Returns an `Err` for the fault code at a call site with the given operands
macro_rules! fault {
    ($code:ident, $site:expr) => {
        Err($crate::fault::Fault::at($crate::fault::FaultCode::$code, $site))
    };
    ($code:ident, $site:expr, $($operand:expr),+) => {
        Err($crate::fault::Fault::at($crate::fault::FaultCode::$code, $site)
            $(.with_operand($operand))+)
    };
}

#[cfg(test)]
mod test {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn codes_are_dense_and_stable() {
        assert_eq!(56, FaultCode::COUNT);

        for (index, code) in FaultCode::iter().enumerate() {
            assert_eq!(index + 1, code.code() as usize);
            assert_eq!(Some(code), FaultCode::from_code(code.code()));
        }

        assert_eq!(None, FaultCode::from_code(0));
        assert_eq!(None, FaultCode::from_code(57));

        assert_eq!(7, FaultCode::DivisionByZero.code());
        assert_eq!(23, FaultCode::StackOverflow.code());
        assert_eq!(43, FaultCode::PortClosed.code());
        assert_eq!(56, FaultCode::RestArgOutOfBounds.code());
    }

    #[test]
    fn categories() {
        assert_eq!(FaultCategory::Arity, FaultCode::BadArgumentCount.category());
        assert_eq!(FaultCategory::Type, FaultCode::NoPair.category());
        assert_eq!(FaultCategory::Arithmetic, FaultCode::DivisionByZero.category());
        assert_eq!(FaultCategory::Resource, FaultCode::StackOverflow.category());
        assert_eq!(FaultCategory::Structural, FaultCode::LostLocative.category());
        assert_eq!(FaultCategory::Port, FaultCode::PortClosed.category());
    }

    #[test]
    fn display() {
        let fault = Fault::at(FaultCode::DivisionByZero, "fx/").with_operand(Word::fix(1));

        assert_eq!("(fx/) division by zero", fault.to_string());
        assert_eq!(&[Word::fix(1)], fault.operands());
        assert_eq!(
            "(runtime) out of range",
            Fault::new(FaultCode::OutOfRange).to_string()
        );
    }

    #[test]
    fn raise_and_catch() {
        let result: Result<()> = catch_fault(|| Fault::new(FaultCode::NoPair).raise());
        assert_eq!(FaultCode::NoPair, result.unwrap_err().code());

        assert_eq!(Ok(3), catch_fault(|| 1 + 2));
    }

    #[test]
    fn other_panics_continue() {
        let outer = panic::catch_unwind(|| catch_fault(|| panic::resume_unwind(Box::new(5u8))));
        assert!(outer.is_err());
    }
}
