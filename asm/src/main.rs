use color_print::{cprint, cprintln};
use w16asm::error::Error;
use w16asm::memory::DataKind;
use w16asm::Assembly;

const HELP_TEMPLATE: &str = "\
{before-help}{bin} {version}
  {about}

{usage-heading}
{tab}{usage}

{all-args}{after-help}";

#[derive(Debug, clap::Parser)]
#[clap(version, about = "Assembler for the W16 architecture", help_template = HELP_TEMPLATE)]
struct Args {
    /// Assembly source file
    input: String,

    /// Binary destination file
    output: String,

    /// Symbol table destination file (CSV)
    symbols: Option<String>,

    /// Dump the assembled image
    #[clap(short, long)]
    dump: bool,
}

fn main() {
    use clap::Parser;

    let args = Args::parse();
    if let Err(err) = run(&args) {
        cprintln!("<red,bold>error</>: {}", err);
        std::process::exit(err.exit_code() as i32);
    }
}

fn run(args: &Args) -> Result<(), Error> {
    let source = std::fs::read_to_string(&args.input).map_err(|source| Error::SourceRead {
        path: args.input.clone(),
        source,
    })?;

    let assembly = w16asm::assemble(&source)?;

    let binary = assembly.binary().ok_or(Error::ResultProgramEmpty)?;
    std::fs::write(&args.output, binary).map_err(|source| Error::BinaryWrite {
        path: args.output.clone(),
        source,
    })?;

    if let Some(path) = &args.symbols {
        let mut csv = String::new();
        for (address, name) in assembly.symbols() {
            csv.push_str(&format!("{address},{name}\n"));
        }
        std::fs::write(path, csv).map_err(|source| Error::SymbolsWrite {
            path: path.clone(),
            source,
        })?;
    }

    if args.dump {
        dump(&assembly);
    }

    Ok(())
}

fn dump(assembly: &Assembly) {
    use arch::op::Op;
    use arch::{OPCODE_SHIFT, OPERAND_MASK};

    let image = assembly.image();
    let Some(top) = image.highest_written() else {
        return;
    };

    println!("-------+----+------+------------------");
    for address in 0..=top {
        let byte = image.byte(address);
        cprint!(" <green>{:04X}</> | {:02X} ", address, byte);
        match image.kind(address) {
            DataKind::None => cprint!("|      |"),
            DataKind::Instruction => {
                let word = u16::from_le_bytes([byte, image.byte(address + 1)]);
                let operand = word & OPERAND_MASK;
                match Op::try_from((word >> OPCODE_SHIFT) as u8) {
                    Ok(op) => cprint!("| <red>inst</> | {:<4}0x{:04X}", op, operand),
                    Err(_) => cprint!("| <red>inst</> |"),
                }
            }
            DataKind::Char => cprint!("| <blue>char</> |"),
            DataKind::Int => cprint!("| <yellow>int</>  |"),
        }
        if let Some(name) = assembly.symbol_at(address) {
            cprint!(" <cyan>{}</>", name);
        }
        println!();
    }
    println!("-------+----+------+------------------");
}
