use std::fmt;

use thiserror::Error;

/// Which flavor of quoted literal was left open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteKind {
    String,
    Character,
}

impl fmt::Display for QuoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuoteKind::String => write!(f, "string"),
            QuoteKind::Character => write!(f, "character"),
        }
    }
}

/// Every failure the assembler can report. The first error encountered is
/// fatal; nothing is recovered or accumulated.
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to read file: {path}")]
    SourceRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write file: {path}")]
    BinaryWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write symbols file: {path}")]
    SymbolsWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("the assembled program is empty")]
    ResultProgramEmpty,

    #[error("line {line}: number {value} is out of range")]
    NumberOutOfRange { line: usize, value: i32 },

    #[error("line {line}: character literal \"{text}\" evaluates to {value}, which is out of range")]
    CharacterOutOfRange {
        line: usize,
        text: String,
        value: i32,
    },

    #[error("line {line}: label name too long")]
    LabelNameTooLong { line: usize },

    #[error("line {line}: \"{name}\" is not a valid label name")]
    InvalidLabelName { line: usize, name: String },

    #[error("line {line}: label name \"{name}\" is not unique")]
    LabelNameNotUnique { line: usize, name: String },

    #[error("line {line}: \"{text}\" is not a valid number")]
    InvalidNumberLiteral { line: usize, text: String },

    #[error("line {line}: invalid escape sequence \"\\{text}\"")]
    InvalidEscapeSequence { line: usize, text: String },

    #[error("line {line}: unterminated {kind} literal")]
    UnterminatedLiteral { line: usize, kind: QuoteKind },

    #[error("line {line}: attempting to declare memory value outside of address space")]
    DeclaringValueOutOfMemoryRange { line: usize },

    #[error("line {line}: attempting to override memory value")]
    MemoryValueOverridden { line: usize },

    #[error("line {line}: too many label definitions")]
    TooManyLabelDefinitions { line: usize },

    #[error("line {line}: too many label uses")]
    TooManyLabelUses { line: usize },

    #[error("line {line}: \"{reference}\" evaluates to {address}, which is an invalid address")]
    ReferenceToInvalidAddress {
        line: usize,
        reference: String,
        address: i32,
    },

    #[error("line {line}: attempting to set origin to an invalid address 0x{address:04X}")]
    OriginOutOfMemoryRange { line: usize, address: i32 },

    #[error("line {line}: invalid directive argument: {reason}")]
    InvalidDirectiveArgument { line: usize, reason: String },

    #[error("line {line}: invalid token \"{text}\"")]
    InvalidToken { line: usize, text: String },

    #[error("line {line}: \"{text}\" is not a valid character literal")]
    InvalidCharacterLiteral { line: usize, text: String },

    #[error("line {line}: label \"{name}\" is undefined")]
    UndefinedLabel { line: usize, name: String },

    #[error("line {line}: unexpected end of file")]
    UnexpectedEndOfFile { line: usize },

    #[error("line {line}: instruction \"{op}\" does not accept an immediate value as an argument")]
    InvalidInstructionArgument { line: usize, op: arch::op::Op },

    #[error("line {line}: too many immediate value uses")]
    TooManyImmediateValueUses { line: usize },
}

impl Error {
    /// Stable exit status per error kind, suitable for scripting. Codes 1-24
    /// follow the historical enumeration; 25 and 26 are appended after it.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::SourceRead { .. } => 1,
            Error::BinaryWrite { .. } => 2,
            Error::SymbolsWrite { .. } => 3,
            Error::ResultProgramEmpty => 4,
            Error::NumberOutOfRange { .. } => 6,
            Error::CharacterOutOfRange { .. } => 7,
            Error::LabelNameTooLong { .. } => 8,
            Error::InvalidLabelName { .. } => 9,
            Error::LabelNameNotUnique { .. } => 10,
            Error::InvalidNumberLiteral { .. } => 11,
            Error::InvalidEscapeSequence { .. } => 12,
            Error::UnterminatedLiteral { .. } => 13,
            Error::DeclaringValueOutOfMemoryRange { .. } => 14,
            Error::MemoryValueOverridden { .. } => 15,
            Error::TooManyLabelDefinitions { .. } => 16,
            Error::TooManyLabelUses { .. } => 17,
            Error::ReferenceToInvalidAddress { .. } => 18,
            Error::OriginOutOfMemoryRange { .. } => 19,
            Error::InvalidDirectiveArgument { .. } => 20,
            Error::InvalidToken { .. } => 21,
            Error::InvalidCharacterLiteral { .. } => 22,
            Error::UndefinedLabel { .. } => 23,
            Error::UnexpectedEndOfFile { .. } => 24,
            Error::InvalidInstructionArgument { .. } => 25,
            Error::TooManyImmediateValueUses { .. } => 26,
        }
    }
}
