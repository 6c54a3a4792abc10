use std::fmt::Display;

#[derive(Debug)]
pub struct Program(pub Vec<Instruction>);

/// A delimited unit of execution. `depth` is fixed at parse time: 0 at top
/// level, parent + 1 for every level of enclosure.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub kind: InstructionKind,
    pub depth: usize,
    pub elements: Vec<Element>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionKind {
    /// `(< ... >)` — the body always runs.
    Normal,
    /// `(? ... ?)` — the body runs only while the current cell is non-zero.
    Conditional,
}

#[derive(Debug, Clone)]
pub enum Element {
    Symbol(Op),
    Nested(Instruction),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Plus,
    Minus,
    Up,
    Down,
    Print,
    Read,
    Clear,
}

impl Op {
    pub fn symbol(&self) -> char {
        match self {
            Op::Plus => '+',
            Op::Minus => '-',
            Op::Up => '^',
            Op::Down => 'v',
            Op::Print => '.',
            Op::Read => ',',
            Op::Clear => '#',
        }
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for instruction in &self.0 {
            writeln!(f, "{}", instruction)?;
        }
        Ok(())
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pad = "  ".repeat(self.depth);
        let (open, close) = match self.kind {
            InstructionKind::Normal => ("(<", ">)"),
            InstructionKind::Conditional => ("(?", "?)"),
        };

        writeln!(f, "{}{}", pad, open)?;
        let mut symbols = String::new();
        for element in &self.elements {
            match element {
                Element::Symbol(op) => symbols.push(op.symbol()),
                Element::Nested(child) => {
                    if !symbols.is_empty() {
                        writeln!(f, "{}  {}", pad, symbols)?;
                        symbols.clear();
                    }
                    writeln!(f, "{}", child)?;
                }
            }
        }
        if !symbols.is_empty() {
            writeln!(f, "{}  {}", pad, symbols)?;
        }
        write!(f, "{}{}", pad, close)
    }
}

impl Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}
