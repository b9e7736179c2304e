use arch::directive::Directive;
use arch::op::Op;
use arch::ADDRESS_SPACE_SIZE;

use crate::error::Error;
use crate::lexer::{Lexer, Token};
use crate::literal;
use crate::memory::{DataKind, MemoryImage};

pub const MAX_LABEL_DEFS: usize = 0x1000;
pub const MAX_LABEL_USES: usize = 0x1000;
pub const MAX_IMMEDIATE_USES: usize = 0x1000;
pub const MAX_LABEL_NAME_LEN: usize = 31;

// ----------------------------------------------------------------------------
// Deferred records

/// A `name:` token consumed at a known cursor position. The address may
/// still be rewritten by an `.ORG`/`.ALIGN` later in the same statement.
#[derive(Debug, Clone)]
pub struct LabelDef {
    pub name: String,
    pub line: usize,
    pub address: i32,
}

/// Which byte of a resolved label address a use patches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteSel {
    Low,
    High,
}

/// A reference to a label whose address may not be known yet. A 16-bit
/// instruction operand is recorded as two uses, one per byte; `.LSB`/`.MSB`
/// record one.
#[derive(Debug, Clone)]
pub struct LabelUse {
    pub name: String,
    pub offset: i32,
    pub byte: ByteSel,
    pub line: usize,
    pub patch_address: usize,
}

/// An instruction operand prefixed with `#`, decoded and patched in after
/// the main pass.
#[derive(Debug, Clone, Copy)]
pub struct ImmediateUse<'a> {
    pub text: &'a str,
    pub line: usize,
    pub patch_address: usize,
}

// ----------------------------------------------------------------------------
// Main pass

/// The single-scan pass: consumes the token stream, writes the memory image,
/// and accumulates the deferred records the resolver patches afterwards.
pub struct Encoder<'a> {
    lexer: Lexer<'a>,
    cursor: i32,
    pub image: MemoryImage,
    pub defs: Vec<LabelDef>,
    pub uses: Vec<LabelUse>,
    pub immediates: Vec<ImmediateUse<'a>>,
}

impl<'a> Encoder<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            lexer: Lexer::new(source),
            cursor: 0,
            image: MemoryImage::new(),
            defs: Vec::new(),
            uses: Vec::new(),
            immediates: Vec::new(),
        }
    }

    /// Consumes the whole token stream.
    pub fn run(&mut self) -> Result<(), Error> {
        while self.statement()? {}
        Ok(())
    }

    /// One statement: zero or more label definitions, then exactly one
    /// instruction, directive or literal declaration. Returns `false` at a
    /// clean end of input.
    fn statement(&mut self) -> Result<bool, Error> {
        let defs_start = self.defs.len();

        let token = loop {
            let Some(token) = self.lexer.next_token()? else {
                if self.defs.len() > defs_start {
                    return Err(Error::UnexpectedEndOfFile {
                        line: self.lexer.line(),
                    });
                }
                return Ok(false);
            };
            match token.text.strip_suffix(':') {
                Some(name) => self.define_label(name, token.line)?,
                None => break token,
            }
        };

        if let Some(op) = Op::parse(token.text) {
            self.instruction(op, token.line)?;
        } else if let Some(directive) = Directive::parse(token.text) {
            self.directive(directive, defs_start)?;
        } else if literal::is_string(token.text) {
            self.declare_string(token)?;
        } else if literal::is_number(token.text) {
            self.declare_number(token)?;
        } else if literal::is_character(token.text) {
            self.declare_character(token)?;
        } else {
            return Err(Error::InvalidToken {
                line: token.line,
                text: token.text.to_string(),
            });
        }

        Ok(true)
    }

    fn define_label(&mut self, name: &str, line: usize) -> Result<(), Error> {
        if name.len() > MAX_LABEL_NAME_LEN {
            return Err(Error::LabelNameTooLong { line });
        }
        let valid = !name.is_empty()
            && name
                .bytes()
                .enumerate()
                .all(|(i, b)| b == b'_' || b.is_ascii_alphabetic() || (i > 0 && b.is_ascii_digit()));
        if !valid {
            return Err(Error::InvalidLabelName {
                line,
                name: name.to_string(),
            });
        }
        if self.defs.iter().any(|def| def.name == name) {
            return Err(Error::LabelNameNotUnique {
                line,
                name: name.to_string(),
            });
        }
        if self.defs.len() >= MAX_LABEL_DEFS {
            return Err(Error::TooManyLabelDefinitions { line });
        }
        self.defs.push(LabelDef {
            name: name.to_string(),
            line,
            address: self.cursor,
        });
        Ok(())
    }

    fn next_required_token(&mut self) -> Result<Token<'a>, Error> {
        self.lexer.next_token()?.ok_or(Error::UnexpectedEndOfFile {
            line: self.lexer.line(),
        })
    }

    // ------------------------------------------------------------------------
    // Instructions

    fn instruction(&mut self, op: Op, line: usize) -> Result<(), Error> {
        let first = self.image.claim(self.cursor, line)?;
        self.image.claim(self.cursor + 1, line)?;
        self.image.set_kind(first, DataKind::Instruction);

        let mut word = op.word(0);
        let operand = self.next_required_token()?;

        if literal::is_number(operand.text) {
            let value = literal::parse_number(operand)?;
            if value < 0 || value as usize >= ADDRESS_SPACE_SIZE {
                return Err(Error::ReferenceToInvalidAddress {
                    line: operand.line,
                    reference: operand.text.to_string(),
                    address: value,
                });
            }
            word |= value as u16;
        } else if literal::is_immediate(operand.text) {
            if self.immediates.len() >= MAX_IMMEDIATE_USES {
                return Err(Error::TooManyImmediateValueUses { line: operand.line });
            }
            if !op.accepts_immediate() {
                return Err(Error::InvalidInstructionArgument {
                    line: operand.line,
                    op,
                });
            }
            self.immediates.push(ImmediateUse {
                text: &operand.text[1..],
                line: operand.line,
                patch_address: first,
            });
        } else {
            if self.uses.len() + 2 > MAX_LABEL_USES {
                return Err(Error::TooManyLabelUses { line: operand.line });
            }
            let (name, offset) = literal::parse_label_ref(operand)?;
            self.uses.push(LabelUse {
                name: name.to_string(),
                offset,
                byte: ByteSel::Low,
                line: operand.line,
                patch_address: first,
            });
            self.uses.push(LabelUse {
                name: name.to_string(),
                offset,
                byte: ByteSel::High,
                line: operand.line,
                patch_address: first + 1,
            });
        }

        // Little-endian; deferred operand bits stay zero until the fix-up.
        self.image.store(first, word as u8);
        self.image.store(first + 1, (word >> 8) as u8);
        self.cursor += 2;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Directives

    fn directive(&mut self, directive: Directive, defs_start: usize) -> Result<(), Error> {
        match directive {
            Directive::Org => {
                let param = self.next_required_token()?;
                let address = literal::parse_number(param)?;
                self.set_origin(address, param.line, defs_start)
            }
            Directive::Align => {
                let param = self.next_required_token()?;
                let bits = literal::parse_number(param)?;
                if !(1..=12).contains(&bits) {
                    return Err(Error::InvalidDirectiveArgument {
                        line: param.line,
                        reason: format!("align argument \"{bits}\" must be between 1 and 12"),
                    });
                }
                let mask = (1 << bits) - 1;
                let aligned = if self.cursor & mask == 0 {
                    self.cursor
                } else {
                    (self.cursor | mask) + 1
                };
                self.set_origin(aligned, param.line, defs_start)
            }
            Directive::Fill => self.fill(),
            Directive::Lsb => self.lsb_or_msb(ByteSel::Low),
            Directive::Msb => self.lsb_or_msb(ByteSel::High),
        }
    }

    // Label definitions collected earlier in the same statement rebind to the
    // new origin.
    fn set_origin(&mut self, address: i32, line: usize, defs_start: usize) -> Result<(), Error> {
        if address < 0 || address as usize >= ADDRESS_SPACE_SIZE {
            return Err(Error::OriginOutOfMemoryRange { line, address });
        }
        self.cursor = address;
        for def in &mut self.defs[defs_start..] {
            def.address = address;
        }
        Ok(())
    }

    fn fill(&mut self) -> Result<(), Error> {
        let value_param = self.next_required_token()?;
        let count_param = self.next_required_token()?;

        let (value, kind) = if literal::is_character(value_param.text) {
            (literal::parse_byte_character(value_param)?, DataKind::Char)
        } else if literal::is_number(value_param.text) {
            (literal::parse_byte_number(value_param)?, DataKind::Int)
        } else {
            return Err(Error::InvalidDirectiveArgument {
                line: value_param.line,
                reason: format!(
                    "\"{}\" is neither a character nor a number",
                    value_param.text
                ),
            });
        };

        let count = literal::parse_number(count_param)?;
        if count < 1 {
            return Err(Error::InvalidDirectiveArgument {
                line: count_param.line,
                reason: "fill count must be positive".to_string(),
            });
        }

        for _ in 0..count {
            self.image
                .declare(self.cursor, value as u8, kind, count_param.line)?;
            self.cursor += 1;
        }
        Ok(())
    }

    fn lsb_or_msb(&mut self, byte: ByteSel) -> Result<(), Error> {
        let param = self.next_required_token()?;
        let (name, offset) = literal::parse_label_ref(param)?;
        let address = self.image.claim(self.cursor, param.line)?;
        self.image.set_kind(address, DataKind::Int);
        if self.uses.len() >= MAX_LABEL_USES {
            return Err(Error::TooManyLabelUses { line: param.line });
        }
        self.uses.push(LabelUse {
            name: name.to_string(),
            offset,
            byte,
            line: param.line,
            patch_address: address,
        });
        self.cursor += 1;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Bare literal declarations

    fn declare_string(&mut self, token: Token) -> Result<(), Error> {
        let decoded = literal::parse_string(token)?;
        for value in decoded.bytes {
            self.image
                .declare(self.cursor, value, DataKind::Char, token.line)?;
            self.cursor += 1;
        }
        if decoded.zero_terminated {
            self.image
                .declare(self.cursor, 0, DataKind::Char, token.line)?;
            self.cursor += 1;
        }
        Ok(())
    }

    fn declare_number(&mut self, token: Token) -> Result<(), Error> {
        let address = self.image.claim(self.cursor, token.line)?;
        let value = literal::parse_byte_number(token)?;
        self.image.set_kind(address, DataKind::Int);
        self.image.store(address, value as u8);
        self.cursor += 1;
        Ok(())
    }

    fn declare_character(&mut self, token: Token) -> Result<(), Error> {
        let address = self.image.claim(self.cursor, token.line)?;
        let value = literal::parse_byte_character(token)?;
        self.image.set_kind(address, DataKind::Char);
        self.image.store(address, value as u8);
        self.cursor += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(source: &str) -> Encoder<'_> {
        let mut encoder = Encoder::new(source);
        encoder.run().unwrap();
        encoder
    }

    fn encode_err(source: &str) -> Error {
        let mut encoder = Encoder::new(source);
        encoder.run().unwrap_err()
    }

    #[test]
    fn instruction_writes_word_and_claims_both_bytes() {
        let encoder = encode("JMP 0x1234");
        assert_eq!(encoder.image.byte(0), 0x34);
        assert_eq!(encoder.image.byte(1), 0xB2); // (5 << 13 | 0x1234) >> 8
        assert!(encoder.image.is_written(0));
        assert!(encoder.image.is_written(1));
        assert_eq!(encoder.image.kind(0), DataKind::Instruction);
    }

    #[test]
    fn label_operand_records_two_uses_with_zero_placeholder() {
        let encoder = encode("JMN target+3");
        assert_eq!(encoder.uses.len(), 2);
        assert_eq!(encoder.uses[0].name, "target");
        assert_eq!(encoder.uses[0].offset, 3);
        assert_eq!(encoder.uses[0].byte, ByteSel::Low);
        assert_eq!(encoder.uses[0].patch_address, 0);
        assert_eq!(encoder.uses[1].byte, ByteSel::High);
        assert_eq!(encoder.uses[1].patch_address, 1);
        // Operand bits left zero for the fix-up pass.
        assert_eq!(encoder.image.byte(0), 0x00);
        assert_eq!(encoder.image.byte(1), 0xC0);
    }

    #[test]
    fn immediate_operand_is_recorded_for_capable_opcodes() {
        let encoder = encode("ADD #42");
        assert_eq!(encoder.immediates.len(), 1);
        assert_eq!(encoder.immediates[0].text, "42");
        assert_eq!(encoder.immediates[0].patch_address, 0);
    }

    #[test]
    fn immediate_operand_rejected_for_store_and_jumps() {
        assert!(matches!(
            encode_err("ST #42"),
            Error::InvalidInstructionArgument { op: Op::ST, .. }
        ));
        assert!(matches!(
            encode_err("JMZ #0"),
            Error::InvalidInstructionArgument { op: Op::JMZ, .. }
        ));
    }

    #[test]
    fn labels_bind_to_the_current_cursor() {
        let encoder = encode("LD 0\na: b: 7");
        assert_eq!(encoder.defs.len(), 2);
        assert_eq!(encoder.defs[0].name, "a");
        assert_eq!(encoder.defs[0].address, 2);
        assert_eq!(encoder.defs[1].address, 2);
    }

    #[test]
    fn org_rebinds_labels_of_the_same_statement_only() {
        let encoder = encode("early: 5\nlate: also: .ORG 0x40\n6");
        assert_eq!(encoder.defs[0].name, "early");
        assert_eq!(encoder.defs[0].address, 0);
        assert_eq!(encoder.defs[1].address, 0x40);
        assert_eq!(encoder.defs[2].address, 0x40);
        assert_eq!(encoder.image.byte(0x40), 6);
    }

    #[test]
    fn align_rounds_up_only_when_needed() {
        let encoder = encode("1\n.ALIGN 4\n2");
        assert_eq!(encoder.image.byte(0), 1);
        assert_eq!(encoder.image.byte(16), 2);
        assert_eq!(encoder.image.highest_written(), Some(16));

        // Already aligned: no movement.
        let encoder = encode(".ALIGN 4\n3");
        assert_eq!(encoder.image.byte(0), 3);
        assert_eq!(encoder.image.highest_written(), Some(0));
    }

    #[test]
    fn align_argument_must_be_1_to_12() {
        assert!(matches!(
            encode_err(".ALIGN 0"),
            Error::InvalidDirectiveArgument { .. }
        ));
        assert!(matches!(
            encode_err(".ALIGN 13"),
            Error::InvalidDirectiveArgument { .. }
        ));
    }

    #[test]
    fn fill_writes_and_tags_each_byte() {
        let encoder = encode(".FILL 'A' 4");
        for address in 0..4 {
            assert_eq!(encoder.image.byte(address), b'A');
            assert_eq!(encoder.image.kind(address), DataKind::Char);
            assert!(encoder.image.is_written(address));
        }
        assert!(!encoder.image.is_written(4));

        let encoder = encode(".FILL -2 2");
        assert_eq!(encoder.image.byte(0), 0xFE);
        assert_eq!(encoder.image.kind(0), DataKind::Int);
    }

    #[test]
    fn fill_rejects_bad_arguments() {
        assert!(matches!(
            encode_err(".FILL 'A' 0"),
            Error::InvalidDirectiveArgument { .. }
        ));
        assert!(matches!(
            encode_err(".FILL x 1"),
            Error::InvalidDirectiveArgument { .. }
        ));
        assert!(matches!(
            encode_err(".FILL 300 1"),
            Error::NumberOutOfRange { value: 300, .. }
        ));
    }

    #[test]
    fn lsb_msb_record_single_byte_uses() {
        let encoder = encode(".LSB here\n.MSB here-1");
        assert_eq!(encoder.uses.len(), 2);
        assert_eq!(encoder.uses[0].byte, ByteSel::Low);
        assert_eq!(encoder.uses[0].patch_address, 0);
        assert_eq!(encoder.uses[1].byte, ByteSel::High);
        assert_eq!(encoder.uses[1].offset, -1);
        assert_eq!(encoder.uses[1].patch_address, 1);
        assert_eq!(encoder.image.kind(0), DataKind::Int);
    }

    #[test]
    fn string_declaration_flavors() {
        let encoder = encode("\"AB\"");
        assert_eq!(encoder.image.byte(0), b'A');
        assert_eq!(encoder.image.byte(1), b'B');
        assert_eq!(encoder.image.byte(2), 0);
        assert_eq!(encoder.image.highest_written(), Some(2));
        assert_eq!(encoder.image.kind(2), DataKind::Char);

        let encoder = encode("\"AB\"nz");
        assert_eq!(encoder.image.highest_written(), Some(1));
    }

    #[test]
    fn duplicate_label_is_fatal() {
        assert!(matches!(
            encode_err("x: 1\nx: 2"),
            Error::LabelNameNotUnique { .. }
        ));
    }

    #[test]
    fn label_name_validation() {
        assert!(matches!(
            encode_err("9lives: 1"),
            Error::InvalidLabelName { .. }
        ));
        assert!(matches!(encode_err(": 1"), Error::InvalidLabelName { .. }));
        let long = format!("{}: 1", "a".repeat(32));
        assert!(matches!(
            encode_err(&long),
            Error::LabelNameTooLong { .. }
        ));
        // 31 characters is still fine.
        let ok = format!("{}: 1", "a".repeat(31));
        assert_eq!(encode(&ok).defs[0].name.len(), 31);
    }

    #[test]
    fn dangling_label_at_eof_is_fatal() {
        assert!(matches!(
            encode_err("x:"),
            Error::UnexpectedEndOfFile { .. }
        ));
        assert!(matches!(
            encode_err("1\ny:\n"),
            Error::UnexpectedEndOfFile { .. }
        ));
    }

    #[test]
    fn missing_operand_is_fatal() {
        assert!(matches!(encode_err("LD"), Error::UnexpectedEndOfFile { .. }));
        assert!(matches!(
            encode_err(".FILL 'A'"),
            Error::UnexpectedEndOfFile { .. }
        ));
    }

    #[test]
    fn unknown_statement_head_is_invalid_token() {
        assert!(matches!(
            encode_err("bogus"),
            Error::InvalidToken { .. }
        ));
    }

    #[test]
    fn origin_out_of_range() {
        assert!(matches!(
            encode_err(".ORG 0x2000"),
            Error::OriginOutOfMemoryRange { .. }
        ));
        assert!(matches!(
            encode_err(".ORG 0x1FFF\n.ALIGN 1"),
            Error::OriginOutOfMemoryRange { .. }
        ));
    }

    #[test]
    fn instruction_straddling_end_of_memory() {
        assert!(matches!(
            encode_err(".ORG 0x1FFF\nJMP 0"),
            Error::DeclaringValueOutOfMemoryRange { .. }
        ));
        let encoder = encode(".ORG 0x1FFE\nJMP 0");
        assert_eq!(encoder.image.highest_written(), Some(0x1FFF));
    }
}
