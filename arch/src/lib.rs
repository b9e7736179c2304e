pub mod directive;
pub mod op;

/// Number of byte addresses the W16 can reach.
pub const ADDRESS_SPACE_SIZE: usize = 0x2000;

/// Bit position of the opcode within a 16-bit instruction word.
pub const OPCODE_SHIFT: u32 = 13;

/// Low bits of an instruction word holding the address or immediate operand.
pub const OPERAND_MASK: u16 = 0x1FFF;
