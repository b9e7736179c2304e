pub mod encoder;
pub mod error;
pub mod lexer;
pub mod literal;
pub mod memory;
pub mod resolver;

use indexmap::IndexMap;

use encoder::Encoder;
use memory::MemoryImage;

pub use error::Error;

/// The finished image and symbol table of one assembly run.
#[derive(Debug)]
pub struct Assembly {
    image: MemoryImage,
    symbols: IndexMap<usize, String>,
}

impl Assembly {
    /// The image truncated past the highest written address; `None` when the
    /// source declared nothing.
    pub fn binary(&self) -> Option<&[u8]> {
        self.image.binary()
    }

    pub fn image(&self) -> &MemoryImage {
        &self.image
    }

    /// `(address, name)` pairs in ascending address order. Where several
    /// labels share an address the first-defined one is reported.
    pub fn symbols(&self) -> Vec<(usize, &str)> {
        let mut pairs: Vec<_> = self
            .symbols
            .iter()
            .map(|(&address, name)| (address, name.as_str()))
            .collect();
        pairs.sort_by_key(|&(address, _)| address);
        pairs
    }

    pub fn symbol_at(&self, address: usize) -> Option<&str> {
        self.symbols.get(&address).map(String::as_str)
    }
}

/// One-shot translation of assembly source into a W16 memory image. The
/// encoder consumes the whole token stream before the resolver patches any
/// deferred reference; the first error aborts the run.
pub fn assemble(source: &str) -> Result<Assembly, Error> {
    let mut encoder = Encoder::new(source);
    encoder.run()?;
    let symbols = resolver::resolve(
        &encoder.defs,
        &encoder.uses,
        &encoder.immediates,
        &mut encoder.image,
    )?;
    Ok(Assembly {
        image: encoder.image,
        symbols,
    })
}
