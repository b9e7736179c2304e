use arch::ADDRESS_SPACE_SIZE;
use indexmap::IndexMap;

use crate::encoder::{ByteSel, ImmediateUse, LabelDef, LabelUse};
use crate::error::Error;
use crate::lexer::Token;
use crate::literal;
use crate::memory::MemoryImage;

/// The fix-up pass. Runs once, after the encoder has consumed all input and
/// label addresses can no longer move. Patches every deferred label and
/// immediate use into the image and returns the address → label-name table.
pub fn resolve(
    defs: &[LabelDef],
    uses: &[LabelUse],
    immediates: &[ImmediateUse],
    image: &mut MemoryImage,
) -> Result<IndexMap<usize, String>, Error> {
    for label_use in uses {
        patch_label_use(label_use, defs, image)?;
    }
    for immediate in immediates {
        patch_immediate(immediate, image)?;
    }
    Ok(symbol_table(defs))
}

fn patch_label_use(
    label_use: &LabelUse,
    defs: &[LabelDef],
    image: &mut MemoryImage,
) -> Result<(), Error> {
    let def = defs
        .iter()
        .find(|def| def.name == label_use.name)
        .ok_or_else(|| Error::UndefinedLabel {
            line: label_use.line,
            name: label_use.name.clone(),
        })?;

    let target = def.address + label_use.offset;
    if target < 0 || target as usize >= ADDRESS_SPACE_SIZE {
        return Err(Error::ReferenceToInvalidAddress {
            line: label_use.line,
            reference: reference_text(label_use),
            address: target,
        });
    }

    let value = match label_use.byte {
        ByteSel::Low => target as u8,
        ByteSel::High => (target >> 8) as u8,
    };
    image.patch(label_use.patch_address, value);
    Ok(())
}

// The payload after `#` is decoded here, not in the main pass, and patched
// in like a numeric address operand.
fn patch_immediate(immediate: &ImmediateUse, image: &mut MemoryImage) -> Result<(), Error> {
    let token = Token {
        line: immediate.line,
        text: immediate.text,
    };
    let value = if literal::is_number(immediate.text) {
        literal::parse_number(token)?
    } else if literal::is_character(immediate.text) {
        literal::parse_character(token)?
    } else {
        return Err(Error::InvalidToken {
            line: immediate.line,
            text: immediate.text.to_string(),
        });
    };

    if value < 0 || value as usize >= ADDRESS_SPACE_SIZE {
        return Err(Error::ReferenceToInvalidAddress {
            line: immediate.line,
            reference: immediate.text.to_string(),
            address: value,
        });
    }

    image.patch(immediate.patch_address, value as u8);
    image.patch(immediate.patch_address + 1, (value >> 8) as u8);
    Ok(())
}

fn reference_text(label_use: &LabelUse) -> String {
    if label_use.offset < 0 {
        format!("{}{}", label_use.name, label_use.offset)
    } else {
        format!("{}+{}", label_use.name, label_use.offset)
    }
}

/// Address → label name. Definitions are walked in reverse insertion order
/// and written unconditionally, so where several labels share an address the
/// first-defined one ends up in the table.
fn symbol_table(defs: &[LabelDef]) -> IndexMap<usize, String> {
    let mut symbols = IndexMap::new();
    for def in defs.iter().rev() {
        symbols.insert(def.address as usize, def.name.clone());
    }
    symbols
}
