use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum::{Display, EnumString};

use crate::{OPCODE_SHIFT, OPERAND_MASK};

/// The eight W16 opcodes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive, EnumString, Display,
)]
#[strum(ascii_case_insensitive)]
#[repr(u8)]
pub enum Op {
    LD = 0,
    NOT = 1,
    ADD = 2,
    AND = 3,
    ST = 4,
    JMP = 5,
    JMN = 6,
    JMZ = 7,
}

impl Op {
    pub fn parse(s: &str) -> Option<Self> {
        s.parse::<Self>().ok()
    }

    /// Encode the 16-bit instruction word for this opcode.
    pub fn word(self, operand: u16) -> u16 {
        ((u8::from(self) as u16) << OPCODE_SHIFT) | (operand & OPERAND_MASK)
    }

    /// `ST` and the jumps only take a memory address operand.
    pub fn accepts_immediate(self) -> bool {
        matches!(self, Op::LD | Op::NOT | Op::ADD | Op::AND)
    }
}
