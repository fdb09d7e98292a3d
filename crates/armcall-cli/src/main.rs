use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;

use armcall::lower::{Scope, resolve_address};
use armcall::{
    Argument, Cond, Emitter, FrameBase, ProcedureDecl, ProcedureLowering, Reg, RegSet,
    SpillPolicy, SymbolTable, lower_call,
};

const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "armcall")]
#[command(about = "ARM32 calling-convention and stack-frame lowering")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Lower {
        #[arg(help = "Input directive file")]
        input: PathBuf,

        #[arg(short, long, help = "Output assembly listing")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Lower { input, output } => {
            let source = fs::read_to_string(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;

            let mut unit = Unit::new();
            for (line_no, raw) in source.lines().enumerate() {
                unit.process_line(raw)
                    .with_context(|| format!("{}:{}", input.display(), line_no + 1))?;
            }
            let listing = unit
                .finish()
                .with_context(|| input.display().to_string())?;

            fs::write(&output, &listing)
                .with_context(|| format!("Failed to write output to {}", output.display()))?;
            println!(
                "Lowered {} procedure(s), {} call site(s) -> {} (armcall {ENGINE_VERSION})",
                unit.procedures,
                unit.calls,
                output.display()
            );
        }
    }

    Ok(())
}

/// One compilation unit built up line by line.
struct Unit {
    emitter: Emitter,
    symbols: SymbolTable,
    current: Option<ProcedureLowering>,
    in_locals: bool,
    procedures: usize,
    calls: usize,
}

impl Unit {
    fn new() -> Self {
        Self {
            emitter: Emitter::new(0),
            symbols: SymbolTable::new(),
            current: None,
            in_locals: false,
            procedures: 0,
            calls: 0,
        }
    }

    fn process_line(&mut self, raw: &str) -> Result<()> {
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            return Ok(());
        }

        if self.in_locals && !line.starts_with("endl") {
            return self.local_declaration(line);
        }

        let (directive, rest) = match line.split_once(char::is_whitespace) {
            Some((d, r)) => (d, r.trim()),
            None => (line, ""),
        };

        match directive {
            "org" => {
                if !self.emitter.items().is_empty() || self.procedures > 0 {
                    bail!("'org' must precede all emission");
                }
                let origin = armcall::lower::eval_literal(rest)?.value;
                self.emitter = Emitter::new(origin);
            }
            "extern" => {
                let (name, addr) = rest
                    .split_once('=')
                    .with_context(|| format!("expected 'extern name = address', got '{rest}'"))?;
                let address = armcall::lower::eval_literal(addr.trim())?.value;
                self.symbols.define_external(name.trim(), address)?;
            }
            "proc" => {
                if self.current.is_some() {
                    bail!("nested procedures are not supported");
                }
                let decl = parse_proc(rest)?;
                self.current = Some(ProcedureLowering::begin(
                    &mut self.emitter,
                    &mut self.symbols,
                    decl,
                )?);
                self.procedures += 1;
            }
            "locals" => {
                let proc_ = self
                    .current
                    .as_mut()
                    .context("'locals' outside a procedure")?;
                proc_.open_locals(&mut self.emitter)?;
                self.in_locals = true;
            }
            "endl" => {
                let proc_ = self
                    .current
                    .as_mut()
                    .context("'endl' outside a procedure")?;
                proc_.close_locals(&mut self.emitter)?;
                self.in_locals = false;
            }
            "call" => {
                let mut operands = split_operands(rest);
                if operands.is_empty() {
                    bail!("'call' needs a target");
                }
                let target = operands.remove(0);
                let args: Vec<Argument> = operands
                    .iter()
                    .map(|op| Argument::parse(op))
                    .collect::<armcall::Result<_>>()?;
                lower_call(
                    &mut self.emitter,
                    &self.symbols,
                    self.current.as_mut(),
                    target.trim(),
                    &args,
                )?;
                self.calls += 1;
            }
            "endp" => {
                let proc_ = self.current.take().context("'endp' without 'proc'")?;
                proc_.finish()?;
            }
            _ => {
                if let Some(cond) = directive.strip_prefix("ret").and_then(Cond::from_suffix) {
                    let proc_ = self.current.as_ref().context("'ret' outside a procedure")?;
                    proc_.emit_return(&mut self.emitter, cond);
                } else if let Some(cond) = directive.strip_prefix("adr").and_then(Cond::from_suffix)
                {
                    let (reg, expr) = rest
                        .split_once(',')
                        .with_context(|| format!("expected 'adr reg, symbol', got '{rest}'"))?;
                    let dst = Reg::from_name(reg.trim())
                        .with_context(|| format!("unknown register '{}'", reg.trim()))?;
                    let expr = armcall::AddressExpr::parse(expr)?;
                    let scope = Scope::new(self.current.as_ref(), &self.symbols);
                    resolve_address(&mut self.emitter, cond, dst, &expr, &scope)?;
                } else {
                    bail!("unknown directive '{directive}'");
                }
            }
        }
        Ok(())
    }

    /// Parse one declaration inside a locals block:
    /// `name word` or `name byte * 64`.
    fn local_declaration(&mut self, line: &str) -> Result<()> {
        let proc_ = self
            .current
            .as_mut()
            .context("local declaration outside a procedure")?;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let (name, ty) = match tokens.as_slice() {
            [name, ty] | [name, ty, "*", _] => (*name, *ty),
            _ => bail!("expected 'name type' or 'name type * count', got '{line}'"),
        };
        let (size, align) = match ty {
            "byte" => (1, 1),
            "hword" => (2, 2),
            "word" => (4, 4),
            "dword" => (8, 8),
            other => bail!("unknown local type '{other}'"),
        };
        if let [_, _, "*", count] = tokens.as_slice() {
            let count = armcall::lower::eval_literal(count)?.value;
            proc_.declare_array(name, size, count)?;
        } else {
            proc_.declare_local(name, size, align)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<String> {
        if let Some(open) = &self.current {
            bail!("procedure '{}' is never closed", open.name());
        }
        self.emitter.resolve_fixups(&self.symbols)?;
        Ok(self.emitter.listing())
    }
}

/// Drop a `;` comment, ignoring semicolons inside quoted literals.
fn strip_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    for (i, c) in line.char_indices() {
        match (quote, c) {
            (None, ';') => return &line[..i],
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), _) if c == q => quote = None,
            _ => {}
        }
    }
    line
}

/// Split a call operand list at commas, keeping bracketed expressions and
/// quoted literals intact.
fn split_operands(rest: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut current = String::new();
    for c in rest.chars() {
        match (quote, c) {
            (None, '[') => {
                depth += 1;
                current.push(c);
            }
            (None, ']') => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            (None, '"' | '\'') => {
                quote = Some(c);
                current.push(c);
            }
            (Some(q), _) if c == q => {
                quote = None;
                current.push(c);
            }
            (None, ',') if depth == 0 => {
                out.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        out.push(current.trim().to_string());
    }
    out
}

/// Parse a procedure header:
/// `name [param ...] [uses reg ...] [spill|nospill] [base reg]`.
fn parse_proc(rest: &str) -> Result<ProcedureDecl> {
    let mut tokens = rest.split_whitespace().peekable();
    let name = tokens.next().context("'proc' needs a name")?.to_string();

    let mut params = Vec::new();
    let mut saves = RegSet::EMPTY;
    let mut spill = SpillPolicy::Spill;
    let mut base = FrameBase::Fp;

    while let Some(token) = tokens.next() {
        match token {
            "uses" => {
                while let Some(next) = tokens.peek() {
                    match Reg::from_name(next) {
                        Some(reg) => {
                            saves.insert(reg);
                            tokens.next();
                        }
                        None => break,
                    }
                }
            }
            "spill" => spill = SpillPolicy::Spill,
            "nospill" => spill = SpillPolicy::NoSpill,
            "base" => {
                let reg_name = tokens.next().context("'base' needs a register")?;
                let reg = Reg::from_name(reg_name)
                    .with_context(|| format!("unknown register '{reg_name}'"))?;
                base = match reg {
                    Reg::Sp => FrameBase::Sp,
                    Reg::Fp => FrameBase::Fp,
                    other => FrameBase::Reg(other),
                };
            }
            param => params.push(param.to_string()),
        }
    }

    Ok(ProcedureDecl {
        name,
        params,
        saves,
        spill,
        base,
    })
}
