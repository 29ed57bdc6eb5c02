//! A symbolic Hack CPU for running translated programs in tests. Assembly
//! is accepted only in the standard mnemonic vocabulary, so anything the
//! real assembler would reject fails here too.

use std::collections::HashMap;

pub const RAM_SIZE: usize = 0x8000;
const FIRST_VARIABLE: u16 = 16;
const STEP_LIMIT: usize = 2_000_000;

const COMPS: [&str; 28] = [
    "0", "1", "-1", "D", "A", "M", "!D", "!A", "!M", "-D", "-A", "-M", "D+1", "A+1", "M+1", "D-1",
    "A-1", "M-1", "D+A", "D+M", "D-A", "D-M", "A-D", "M-D", "D&A", "D&M", "D|A", "D|M",
];
const DESTS: [&str; 7] = ["M", "D", "MD", "A", "AM", "AD", "AMD"];
const JUMPS: [&str; 7] = ["JGT", "JEQ", "JGE", "JLT", "JNE", "JLE", "JMP"];

#[derive(Debug, Clone)]
enum Op {
    Load(u16),
    Compute {
        dest: &'static str,
        comp: &'static str,
        jump: &'static str,
    },
}

fn predefined(symbol: &str) -> Option<u16> {
    Some(match symbol {
        "SP" => 0,
        "LCL" => 1,
        "ARG" => 2,
        "THIS" => 3,
        "THAT" => 4,
        "SCREEN" => 16384,
        "KBD" => 24576,
        _ => return symbol.strip_prefix('R')?.parse().ok().filter(|r: &u16| *r < 16),
    })
}

fn lookup(table: &'static [&'static str], part: &str, what: &str, line: &str) -> Result<&'static str, String> {
    table
        .iter()
        .copied()
        .find(|entry| *entry == part)
        .ok_or_else(|| format!("unknown {} `{}` in `{}`", what, part, line))
}

fn compute(comp: &str, a: i16, d: i16, m: i16) -> i16 {
    match comp {
        "0" => 0,
        "1" => 1,
        "-1" => -1,
        "D" => d,
        "A" => a,
        "M" => m,
        "!D" => !d,
        "!A" => !a,
        "!M" => !m,
        "-D" => d.wrapping_neg(),
        "-A" => a.wrapping_neg(),
        "-M" => m.wrapping_neg(),
        "D+1" => d.wrapping_add(1),
        "A+1" => a.wrapping_add(1),
        "M+1" => m.wrapping_add(1),
        "D-1" => d.wrapping_sub(1),
        "A-1" => a.wrapping_sub(1),
        "M-1" => m.wrapping_sub(1),
        "D+A" => d.wrapping_add(a),
        "D+M" => d.wrapping_add(m),
        "D-A" => d.wrapping_sub(a),
        "D-M" => d.wrapping_sub(m),
        "A-D" => a.wrapping_sub(d),
        "M-D" => m.wrapping_sub(d),
        "D&A" => d & a,
        "D&M" => d & m,
        "D|A" => d | a,
        "D|M" => d | m,
        _ => unreachable!("comp validated at assembly"),
    }
}

fn jumps(jump: &str, value: i16) -> bool {
    match jump {
        "" => false,
        "JGT" => value > 0,
        "JEQ" => value == 0,
        "JGE" => value >= 0,
        "JLT" => value < 0,
        "JNE" => value != 0,
        "JLE" => value <= 0,
        "JMP" => true,
        _ => unreachable!("jump validated at assembly"),
    }
}

pub struct Hack {
    rom: Vec<Op>,
    labels: HashMap<String, usize>,
    pub ram: Vec<i16>,
    pub pc: usize,
    pub a: i16,
    pub d: i16,
    pub steps: usize,
}

impl Hack {
    pub fn assemble(asm: &str) -> Result<Hack, String> {
        let lines: Vec<&str> = asm
            .lines()
            .map(|line| line.split_once("//").map(|(s, _)| s).unwrap_or(line).trim())
            .filter(|line| !line.is_empty())
            .collect();

        let mut labels = HashMap::new();
        let mut address = 0;
        for line in &lines {
            if let Some(label) = line.strip_prefix('(').and_then(|l| l.strip_suffix(')')) {
                if labels.insert(label.to_string(), address).is_some() {
                    return Err(format!("duplicate label `{}`", label));
                }
            } else {
                address += 1;
            }
        }

        let mut variables: HashMap<String, u16> = HashMap::new();
        let mut rom = vec![];
        for line in &lines {
            if line.starts_with('(') {
                continue;
            }
            if let Some(symbol) = line.strip_prefix('@') {
                let value = if let Ok(value) = symbol.parse::<u16>() {
                    if value > 0x7fff {
                        return Err(format!("constant too large in `{}`", line));
                    }
                    value
                } else if let Some(value) = predefined(symbol) {
                    value
                } else if let Some(value) = labels.get(symbol) {
                    *value as u16
                } else {
                    let next = FIRST_VARIABLE + variables.len() as u16;
                    *variables.entry(symbol.to_string()).or_insert(next)
                };
                rom.push(Op::Load(value));
                continue;
            }
            let (dest, rest) = match line.split_once('=') {
                Some((dest, rest)) => (lookup(&DESTS, dest, "dest", line)?, rest),
                None => ("", *line),
            };
            let (comp, jump) = match rest.split_once(';') {
                Some((comp, jump)) => (comp, lookup(&JUMPS, jump, "jump", line)?),
                None => (rest, ""),
            };
            let comp = lookup(&COMPS, comp, "comp", line)?;
            rom.push(Op::Compute { dest, comp, jump });
        }

        Ok(Hack {
            rom,
            labels,
            ram: vec![0; RAM_SIZE],
            pc: 0,
            a: 0,
            d: 0,
            steps: 0,
        })
    }

    pub fn label(&self, label: &str) -> usize {
        *self
            .labels
            .get(label)
            .unwrap_or_else(|| panic!("no label `{}`", label))
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains_key(label)
    }

    fn step(&mut self) {
        let op = self.rom.get(self.pc).cloned().unwrap_or_else(|| {
            panic!("pc {} ran past the end of the program", self.pc)
        });
        match op {
            Op::Load(value) => {
                self.a = value as i16;
                self.pc += 1;
            }
            Op::Compute { dest, comp, jump } => {
                let address = self.a as u16 as usize;
                let m = if comp.contains('M') { self.ram[address] } else { 0 };
                let value = compute(comp, self.a, self.d, m);
                if dest.contains('M') {
                    self.ram[address] = value;
                }
                if dest.contains('D') {
                    self.d = value;
                }
                if dest.contains('A') {
                    self.a = value;
                }
                self.pc = if jumps(jump, value) { address } else { self.pc + 1 };
            }
        }
        self.steps += 1;
    }

    /// Execute until the program counter reaches `label`.
    pub fn run_until(&mut self, label: &str) {
        let target = self.label(label);
        while self.pc != target {
            assert!(self.steps < STEP_LIMIT, "no `{}` after {} steps", label, self.steps);
            self.step();
        }
    }

    /// Execute exactly `steps` more instructions.
    pub fn run_for(&mut self, steps: usize) {
        for _ in 0..steps {
            self.step();
        }
    }

    pub fn sp(&self) -> i16 {
        self.ram[0]
    }

    /// Top of stack.
    pub fn top(&self) -> i16 {
        self.ram[self.sp() as usize - 1]
    }
}
