use crate::ast::{ArithmeticOp as Op, Instruction::*, Segment::*, *};
use crate::error::{Fault, Location, TranslateError};
use crate::parser::MAX_INDEX;

macro_rules! svec {
    ($($x:expr),* $(,)?) => (vec![$($x.to_string()),*]);
}

/// Procedure that owns code emitted before the first `function`.
pub const NULL_PROCEDURE: &str = "null";
/// Target of the bootstrap call unless overridden.
pub const DEFAULT_ENTRY: &str = "Sys.init";
/// Initial value of `SP`, the first cell above the reserved registers.
pub const STACK_BASE: u16 = 256;
/// Frame slots written by `call`: return address, LCL, ARG, THIS, THAT.
pub const FRAME_SIZE: u16 = 5;
const TEMP_BASE: u16 = 5;
const TEMP_SIZE: u16 = 8;
const HALT_LABEL: &str = "$halt";

fn at_c(arg: u16) -> String {
    format!("@{}", arg)
}

fn at_s(arg: &str) -> String {
    format!("@{}", arg)
}

fn pointer_arg(arg: u16) -> Result<&'static str, Fault> {
    match arg {
        0 => Ok("THIS"),
        1 => Ok("THAT"),
        _ => Err(Fault::Segment(format!(
            "pointer index must be 0 or 1, found {}",
            arg
        ))),
    }
}

fn temp_arg(arg: u16) -> Result<String, Fault> {
    if arg < TEMP_SIZE {
        Ok(format!("R{}", TEMP_BASE + arg))
    } else {
        Err(Fault::Segment(format!(
            "temp index must be below {}, found {}",
            TEMP_SIZE, arg
        )))
    }
}

/// Push whatever is in D.
fn push_d() -> Vec<String> {
    svec![
        "@SP",
        "M=M+1",
        "A=M-1", // Don't need to refetch SP; this is safe
        "M=D"
    ]
}

/// Push microcode for the four indirect segments
fn seg_push(seg: &str, arg: u16) -> Vec<String> {
    let mut code = svec![
        at_s(seg),
        "D=M",
        at_c(arg),
        "A=D+A", // A = SEG+arg
        "D=M"    // D = value to push
    ];
    code.extend(push_d());
    code
}

fn seg_push_direct(label: &str) -> Vec<String> {
    let mut code = svec![at_s(label), "D=M"];
    code.extend(push_d());
    code
}

fn seg_pop(seg: &str, arg: u16) -> Vec<String> {
    svec![
        at_s(seg),
        "D=M",
        at_c(arg),
        "D=D+A", // D = SEG+arg
        "@R13",
        "M=D", // Store target addr in R13
        "@SP",
        "AM=M-1", // SP--, A <- new SP (val to be popped)
        "D=M",
        "@R13",
        "A=M", // At the target address...
        "M=D"  // ... store the popped val
    ]
}

fn seg_pop_direct(label: &str) -> Vec<String> {
    svec!["@SP", "AM=M-1", "D=M", at_s(label), "M=D"]
}

fn simple_un_op(comp: &str) -> Vec<String> {
    svec!["@SP", "A=M-1", format!("M={}", comp)]
}

// i.e. no conditions or jumps, just pop and run
fn simple_bin_op(comp: &str) -> Vec<String> {
    svec![
        "@SP",
        "AM=M-1",               // SP--, looking at top of stack now
        "D=M",                  // Right arg in D
        "A=A-1",                // Looking at second arg of stack, will overwrite
        format!("M={}", comp)   // Op and overwrite second element
    ]
}

/// Translation settings that stay fixed for a whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Emit the stack setup and entry call before the first unit.
    pub bootstrap: bool,
    /// Echo each source instruction as a comment above its code.
    pub annotate: bool,
    /// Procedure called by the bootstrap.
    pub entry: String,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            bootstrap: true,
            annotate: true,
            entry: DEFAULT_ENTRY.to_string(),
        }
    }
}

/// Counters and scopes that every later label depends on. Created once per
/// program and carried across all units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationState {
    comparison_counter: usize,
    current_procedure: String,
    call_site_counter: usize,
    current_unit: String,
}

impl Default for TranslationState {
    fn default() -> Self {
        TranslationState {
            comparison_counter: 0,
            current_procedure: NULL_PROCEDURE.to_string(),
            call_site_counter: 0,
            current_unit: String::new(),
        }
    }
}

impl TranslationState {
    pub fn comparison_counter(&self) -> usize {
        self.comparison_counter
    }

    pub fn current_procedure(&self) -> &str {
        &self.current_procedure
    }

    pub fn call_site_counter(&self) -> usize {
        self.call_site_counter
    }

    pub fn current_unit(&self) -> &str {
        &self.current_unit
    }

    fn next_comparison(&mut self) -> usize {
        let tmp = self.comparison_counter;
        self.comparison_counter += 1;
        tmp
    }

    fn next_return_label(&mut self) -> String {
        let label = format!("{}$ret.{}", self.current_procedure, self.call_site_counter);
        self.call_site_counter += 1;
        label
    }

    fn enter_function(&mut self, name: &str) {
        self.current_procedure = name.to_string();
        self.call_site_counter = 0;
    }

    /// Convert VM label to Hack ASM symbol - for consistency across instructions
    fn scoped_label(&self, label: &str) -> String {
        format!("{}${}", self.current_procedure, label)
    }
}

/// Symbols the assembler predefines; a procedure label with one of these
/// names would shadow a register.
const PREDEFINED: [&str; 7] = ["SP", "LCL", "ARG", "THIS", "THAT", "SCREEN", "KBD"];

fn numbered(name: &str, prefix: &str) -> bool {
    name.strip_prefix(prefix)
        .map_or(false, |n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

fn is_register(name: &str) -> bool {
    name.strip_prefix('R')
        .and_then(|n| n.parse::<u8>().ok())
        .map_or(false, |r| r < 16)
}

fn check_separator(name: &str) -> Result<(), Fault> {
    if name.is_empty() || name.contains('$') {
        Err(Fault::Syntax(format!(
            "`{}`: `$` is reserved for label scoping",
            name
        )))
    } else {
        Ok(())
    }
}

/// Names for `label`, `goto` and `if-goto`. They are emitted as
/// `procedure$name`, next to the `procedure$ret.N` return addresses.
pub(crate) fn check_label(name: &str) -> Result<(), Fault> {
    check_separator(name)?;
    if numbered(name, "ret.") {
        return Err(Fault::Syntax(format!(
            "`{}` is reserved for return addresses",
            name
        )));
    }
    Ok(())
}

/// Names for `function` and `call`. They are emitted unscoped, so they share
/// the assembler's namespace with registers, comparison labels and statics.
pub(crate) fn check_procedure(name: &str) -> Result<(), Fault> {
    check_separator(name)?;
    if PREDEFINED.contains(&name) || is_register(name) {
        return Err(Fault::Syntax(format!("`{}` names a predefined symbol", name)));
    }
    if numbered(name, "TRUE_") || numbered(name, "DONE_") {
        return Err(Fault::Syntax(format!(
            "`{}` is reserved for comparison labels",
            name
        )));
    }
    if name
        .rsplit_once('.')
        .map_or(false, |(_, index)| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()))
    {
        return Err(Fault::Syntax(format!(
            "`{}` would collide with a static variable",
            name
        )));
    }
    Ok(())
}

fn halt() -> Vec<String> {
    svec![format!("({})", HALT_LABEL), at_s(HALT_LABEL), "0;JMP"]
}

pub struct Translator {
    options: Options,
    state: TranslationState,
}

impl Translator {
    pub fn new(options: Options) -> Self {
        Translator {
            options,
            state: TranslationState::default(),
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn state(&self) -> &TranslationState {
        &self.state
    }

    /// Switch `static` scoping to a new compilation unit.
    pub fn set_unit(&mut self, unit: &str) {
        self.state.current_unit = unit.to_string();
    }

    fn static_label(&self, arg: u16) -> String {
        format!("{}.{}", self.state.current_unit, arg)
    }

    fn push(&self, segment: Segment, arg: u16) -> Result<Vec<String>, Fault> {
        Ok(match segment {
            Constant if arg > MAX_INDEX => {
                return Err(Fault::Segment(format!("constant {} does not fit in 15 bits", arg)))
            }
            Constant => {
                let mut code = svec![at_c(arg), "D=A"];
                code.extend(push_d());
                code
            }
            Local => seg_push("LCL", arg),
            Argument => seg_push("ARG", arg),
            This => seg_push("THIS", arg),
            That => seg_push("THAT", arg),
            Static => seg_push_direct(&self.static_label(arg)),
            Temp => seg_push_direct(&temp_arg(arg)?),
            Pointer => seg_push_direct(pointer_arg(arg)?),
        })
    }

    fn pop(&self, segment: Segment, arg: u16) -> Result<Vec<String>, Fault> {
        Ok(match segment {
            Constant => {
                return Err(Fault::Segment(
                    "cannot pop into the constant segment".to_string(),
                ))
            }
            Local => seg_pop("LCL", arg),
            Argument => seg_pop("ARG", arg),
            This => seg_pop("THIS", arg),
            That => seg_pop("THAT", arg),
            Static => seg_pop_direct(&self.static_label(arg)),
            Temp => seg_pop_direct(&temp_arg(arg)?),
            Pointer => seg_pop_direct(pointer_arg(arg)?),
        })
    }

    fn compare(&mut self, jump: &str) -> Vec<String> {
        let sym = self.state.next_comparison();
        let true_sym = format!("TRUE_{}", sym);
        let done_sym = format!("DONE_{}", sym);
        svec![
            "@SP",
            "AM=M-1", // SP--, looking at top of stack now
            "D=M",    // Right arg in D
            "A=A-1",  // Looking at second arg of stack, will overwrite
            "D=M-D",
            at_s(&true_sym),
            format!("D;{}", jump),
            "D=0",
            at_s(&done_sym),
            "0;JMP",
            format!("({})", true_sym),
            "D=-1",
            format!("({})", done_sym),
            "@SP",
            "A=M-1",
            "M=D"
        ]
    }

    fn arithmetic(&mut self, op: Op) -> Vec<String> {
        match op {
            Op::Not => simple_un_op("!M"),
            Op::Neg => simple_un_op("-M"),
            Op::Add => simple_bin_op("D+M"),
            Op::Sub => simple_bin_op("M-D"),
            Op::And => simple_bin_op("D&M"),
            Op::Or => simple_bin_op("D|M"),
            Op::Eq => self.compare("JEQ"),
            Op::Gt => self.compare("JGT"),
            Op::Lt => self.compare("JLT"),
        }
    }

    fn label(&self, label: &str) -> Result<Vec<String>, Fault> {
        check_label(label)?;
        Ok(svec![format!("({})", self.state.scoped_label(label))])
    }

    fn goto(&self, label: &str) -> Result<Vec<String>, Fault> {
        check_label(label)?;
        Ok(svec![
            at_s(&self.state.scoped_label(label)),
            "0;JMP" // Unconditional jump
        ])
    }

    fn if_goto(&self, label: &str) -> Result<Vec<String>, Fault> {
        check_label(label)?;
        Ok(svec![
            "@SP",
            "AM=M-1",
            "D=M", // Stack popped into D
            at_s(&self.state.scoped_label(label)),
            "D;JNE" // False is 0
        ])
    }

    fn function(&mut self, name: &str, n_locals: u16) -> Result<Vec<String>, Fault> {
        check_procedure(name)?;
        self.state.enter_function(name);
        let mut code = svec![format!("({})", name)];
        for _ in 0..n_locals {
            code.extend(svec!["@SP", "M=M+1", "A=M-1", "M=0"]);
        }
        Ok(code)
    }

    fn call(&mut self, callee: &str, n_args: u16) -> Result<Vec<String>, Fault> {
        check_procedure(callee)?;
        let ret = self.state.next_return_label();
        let mut code = svec![at_s(&ret), "D=A"];
        code.extend(push_d());
        for pointer in ["LCL", "ARG", "THIS", "THAT"] {
            code.extend(seg_push_direct(pointer));
        }
        code.extend(svec![
            // ARG = SP - 5 - nArgs
            "@SP",
            "D=M",
            at_c(FRAME_SIZE),
            "D=D-A",
            at_c(n_args),
            "D=D-A",
            "@ARG",
            "M=D",
            // LCL = SP
            "@SP",
            "D=M",
            "@LCL",
            "M=D",
            at_s(callee),
            "0;JMP",
            format!("({})", ret)
        ]);
        Ok(code)
    }

    fn ret(&self) -> Vec<String> {
        let mut code = svec![
            "@LCL",
            "D=M",
            "@R13", // R13 = frame
            "M=D",
            at_c(FRAME_SIZE),
            "A=D-A",
            "D=M",
            "@R14", // R14 = return address, read before ARG's slot is overwritten
            "M=D",
            "@SP",
            "AM=M-1",
            "D=M",
            "@ARG",
            "A=M",
            "M=D", // *ARG = pop()
            "@ARG",
            "D=M+1",
            "@SP",
            "M=D" // SP = ARG + 1
        ];
        for pointer in ["THAT", "THIS", "ARG", "LCL"] {
            code.extend(svec!["@R13", "AM=M-1", "D=M", at_s(pointer), "M=D"]);
        }
        code.extend(svec!["@R14", "A=M", "0;JMP"]);
        code
    }

    fn emit(&mut self, instruction: &Instruction) -> Result<Vec<String>, Fault> {
        match instruction {
            Arithmetic(op) => Ok(self.arithmetic(*op)),
            Push(seg, arg) => self.push(*seg, *arg),
            Pop(seg, arg) => self.pop(*seg, *arg),
            Label(sym) => self.label(sym),
            Goto(sym) => self.goto(sym),
            IfGoto(sym) => self.if_goto(sym),
            Function(name, n_locals) => self.function(name, *n_locals),
            Call(name, n_args) => self.call(name, *n_args),
            Return => Ok(self.ret()),
        }
    }

    /// Stack setup and the call into the entry procedure. Emitted once,
    /// before any unit, from the `null` procedure. When the entry procedure
    /// returns, the CPU parks in the halt loop instead of falling into the
    /// first unit's code.
    pub fn bootstrap(&mut self) -> Result<Vec<String>, TranslateError> {
        let mut code = vec![];
        if self.options.annotate {
            code.push("// bootstrap".to_string());
        }
        code.extend(svec![at_c(STACK_BASE), "D=A", "@SP", "M=D", "@LCL", "M=D"]);
        let entry = self.options.entry.clone();
        let call = self.call(&entry, 0).map_err(|fault| {
            TranslateError::Usage(format!(
                "invalid entry procedure `{}`: {}",
                entry,
                fault.reason()
            ))
        })?;
        code.extend(call);
        code.extend(halt());
        Ok(code)
    }

    /// Code that ends the program. Only needed without a bootstrap, which
    /// already ends in the halt loop.
    pub fn finish(&self) -> Vec<String> {
        if self.options.bootstrap {
            vec![]
        } else {
            halt()
        }
    }

    pub fn translate_line(&mut self, source: &SourceLine) -> Result<Vec<String>, TranslateError> {
        let mut code = vec![];
        if self.options.annotate {
            code.push(format!("// {}", source.text));
        }
        let fragment = self.emit(&source.instruction).map_err(|fault| {
            fault.locate(Location::new(&self.state.current_unit, source.line, &source.text))
        })?;
        code.extend(fragment);
        Ok(code)
    }

    pub fn translate(&mut self, lines: &[SourceLine]) -> Result<Vec<String>, TranslateError> {
        let mut instructions: Vec<String> = vec![];

        for line in lines {
            instructions.extend(self.translate_line(line)?);
        }

        Ok(instructions)
    }
}
