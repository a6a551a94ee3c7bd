use std::path::PathBuf;

use clap::Parser;
use codesnake::{Block, CodeWidth, Label, LineIndex};
use valvm::{
    compile, parse, Code, EnvId, Environments, Error, Interpreter, ParseError, Poll, Value,
};
use yansi::Paint;

/// Read-eval-print loop for valvm programs
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Run this file instead of starting the prompt
    file: Option<PathBuf>,
    /// Print the bytecode of every expression before running it
    #[arg(short, long)]
    disassemble: bool,
    /// Instruction budget for each evaluated expression
    #[arg(long, default_value_t = 100_000, value_parser = clap::value_parser!(u64).range(1..))]
    fuel: u64,
}

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    // Only initialize if RUST_LOG is set
    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_level(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

/// Everything that outlives a single line of input
struct Session {
    envs: Environments,
    root: EnvId,
    disassemble: bool,
    fuel: u64,
}

enum Outcome {
    Value(Value),
    OutOfFuel,
}

impl Session {
    fn new(args: &Args) -> Self {
        let mut envs = Environments::new();
        let root = envs.root();
        Self {
            envs,
            root,
            disassemble: args.disassemble,
            fuel: args.fuel,
        }
    }

    /// Runs every expression in `src`, reporting failures as it goes.
    /// Returns `false` if any expression failed.
    fn eval(&mut self, src: &str, origin: &str) -> bool {
        let expressions = match parse(src) {
            Ok(expressions) => expressions,
            Err(err) => {
                report_parse_error(src, origin, &err);
                return false;
            }
        };

        for expression in &expressions {
            let result = compile(expression)
                .map_err(Error::from)
                .and_then(|code| self.execute(&code));
            match result {
                Ok(Outcome::Value(value)) => println!("{}", value.green()),
                Ok(Outcome::OutOfFuel) => {
                    println!("{}", format!("fuel exhausted after {} instructions", self.fuel).red());
                    return false;
                }
                Err(err) => {
                    println!("{}", err.red());
                    return false;
                }
            }
        }
        true
    }

    fn execute(&mut self, code: &Code) -> Result<Outcome, Error> {
        if self.disassemble {
            println!("{}", code.to_string().dim());
        }
        let mut interpreter = Interpreter::new(code);
        match interpreter.run(&mut self.envs, self.root, self.fuel)? {
            Poll::Ready(value) => Ok(Outcome::Value(value)),
            Poll::Pending => Ok(Outcome::OutOfFuel),
        }
    }

    fn print_env(&self) -> anyhow::Result<()> {
        let bindings = self.envs.bindings(self.root)?;
        if bindings.is_empty() {
            println!("{}", "no bindings".dim());
        }
        for (name, value) in bindings {
            println!("{} = {value}", name.blue());
        }
        Ok(())
    }
}

fn make_block<'a>(idx: &'a LineIndex, err: &ParseError) -> Option<Block<&'a str, String>> {
    let text = err.to_string();
    Block::new(
        idx,
        [Label::new(err.span())
            .with_text(text.red().to_string())
            .with_style(|s| s.red().to_string())],
    )
}

fn report_parse_error(src: &str, origin: &str, err: &ParseError) {
    let idx = LineIndex::new(src);
    // empty spans (such as at the end of input) have nothing to underline
    match make_block(&idx, err).map(|blk| blk.map_code(|c| CodeWidth::new(c, c.len()))) {
        Some(block) => {
            println!("{}[{origin}]", block.prologue());
            print!("{block}");
            println!("{}", block.epilogue());
        }
        None => println!("{}", Error::from(err.clone()).red()),
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();
    let mut session = Session::new(&args);

    if let Some(path) = &args.file {
        let src = std::fs::read_to_string(path)?;
        let origin = path.display().to_string();
        if !session.eval(&src, &origin) {
            anyhow::bail!("failed to run {origin}");
        }
        return Ok(());
    }

    let mut readline = rustyline::DefaultEditor::new()?;
    while let Ok(input) = readline.readline(">> ") {
        let src = input.trim();
        if src.is_empty() {
            continue;
        }
        readline.add_history_entry(src)?;

        match src {
            ":env" => session.print_env()?,
            ":quit" | ":q" => break,
            _ => {
                session.eval(src, "repl");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::Args;
    use assert2::{check, let_assert};
    use clap::Parser;

    #[test]
    fn fuel_must_be_positive() {
        let_assert!(Ok(args) = Args::try_parse_from(["valvm_repl"]));
        check!(args.fuel == 100_000);
        let_assert!(Ok(args) = Args::try_parse_from(["valvm_repl", "--fuel", "1"]));
        check!(args.fuel == 1);

        check!(Args::try_parse_from(["valvm_repl", "--fuel", "0"]).is_err());
        check!(Args::try_parse_from(["valvm_repl", "--fuel", "-5"]).is_err());
    }
}
