use strum::EnumString;

/// Assembler directives. Each consumes a fixed number of operand tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
pub enum Directive {
    #[strum(serialize = ".ORG", ascii_case_insensitive)]
    Org,
    #[strum(serialize = ".ALIGN", ascii_case_insensitive)]
    Align,
    #[strum(serialize = ".FILL", ascii_case_insensitive)]
    Fill,
    #[strum(serialize = ".LSB", ascii_case_insensitive)]
    Lsb,
    #[strum(serialize = ".MSB", ascii_case_insensitive)]
    Msb,
}

impl Directive {
    pub fn parse(s: &str) -> Option<Self> {
        s.parse::<Self>().ok()
    }
}
