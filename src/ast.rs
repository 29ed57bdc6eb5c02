//! The closed set of VM instructions consumed by the translator.

use std::fmt;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Segment {
    Constant,
    Local,
    Static,
    Argument,
    This,
    That,
    Pointer,
    Temp,
}

impl Segment {
    pub fn from_name(name: &str) -> Option<Segment> {
        Some(match name {
            "constant" => Segment::Constant,
            "local" => Segment::Local,
            "static" => Segment::Static,
            "argument" => Segment::Argument,
            "this" => Segment::This,
            "that" => Segment::That,
            "pointer" => Segment::Pointer,
            "temp" => Segment::Temp,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Segment::Constant => "constant",
            Segment::Local => "local",
            Segment::Static => "static",
            Segment::Argument => "argument",
            Segment::This => "this",
            Segment::That => "that",
            Segment::Pointer => "pointer",
            Segment::Temp => "temp",
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
}

impl ArithmeticOp {
    pub fn from_name(name: &str) -> Option<ArithmeticOp> {
        Some(match name {
            "add" => ArithmeticOp::Add,
            "sub" => ArithmeticOp::Sub,
            "neg" => ArithmeticOp::Neg,
            "eq" => ArithmeticOp::Eq,
            "gt" => ArithmeticOp::Gt,
            "lt" => ArithmeticOp::Lt,
            "and" => ArithmeticOp::And,
            "or" => ArithmeticOp::Or,
            "not" => ArithmeticOp::Not,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            ArithmeticOp::Add => "add",
            ArithmeticOp::Sub => "sub",
            ArithmeticOp::Neg => "neg",
            ArithmeticOp::Eq => "eq",
            ArithmeticOp::Gt => "gt",
            ArithmeticOp::Lt => "lt",
            ArithmeticOp::And => "and",
            ArithmeticOp::Or => "or",
            ArithmeticOp::Not => "not",
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Instruction {
    // Stack basics
    Arithmetic(ArithmeticOp),
    Push(Segment, u16),
    Pop(Segment, u16),

    // Control
    Label(String),
    Goto(String),
    IfGoto(String),

    // Linkage
    Function(String, u16),
    Call(String, u16),
    Return,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Arithmetic(op) => write!(f, "{}", op.name()),
            Instruction::Push(seg, idx) => write!(f, "push {} {}", seg.name(), idx),
            Instruction::Pop(seg, idx) => write!(f, "pop {} {}", seg.name(), idx),
            Instruction::Label(name) => write!(f, "label {}", name),
            Instruction::Goto(name) => write!(f, "goto {}", name),
            Instruction::IfGoto(name) => write!(f, "if-goto {}", name),
            Instruction::Function(name, n) => write!(f, "function {} {}", name, n),
            Instruction::Call(name, n) => write!(f, "call {} {}", name, n),
            Instruction::Return => write!(f, "return"),
        }
    }
}

/// One classified instruction together with where it came from.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SourceLine {
    pub instruction: Instruction,
    /// 1-based line number in the unit.
    pub line: usize,
    /// The instruction text with comments and surrounding whitespace removed.
    pub text: String,
}
