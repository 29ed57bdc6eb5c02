use nom::{
    bytes::complete::{is_a, is_not},
    character::complete::{digit1, space1},
    combinator::{all_consuming, map, map_res, verify},
    multi::separated_list1,
    IResult,
};

use crate::ast::{Instruction::*, Segment::*, *};
use crate::error::{Fault, Location, TranslateError};
use crate::translator::{check_label, check_procedure};

/// Largest value an A-instruction can load.
pub const MAX_INDEX: u16 = 0x7fff;

const SYMBOL_CHARS: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_.:0123456789";

fn integer(input: &str) -> IResult<&str, u16> {
    map_res(digit1, |c: &str| c.parse())(input)
}

fn symbol(input: &str) -> IResult<&str, String> {
    map(
        verify(is_a(SYMBOL_CHARS), |c: &str| {
            !c.starts_with(|ch: char| ch.is_ascii_digit())
        }),
        |sym: &str| sym.to_string(),
    )(input)
}

fn words(input: &str) -> IResult<&str, Vec<&str>> {
    separated_list1(space1, is_not(" \t"))(input)
}

#[test]
fn test_words() {
    assert_eq!(
        words("push\t constant  32"),
        Ok(("", vec!["push", "constant", "32"]))
    );
}

fn index(token: &str) -> Result<u16, Fault> {
    match all_consuming(integer)(token) {
        Ok((_, value)) if value <= MAX_INDEX => Ok(value),
        _ if token.starts_with('-') => Err(Fault::Syntax(format!(
            "index `{}` must be non-negative",
            token
        ))),
        _ if token.bytes().all(|b| b.is_ascii_digit()) => Err(Fault::Syntax(format!(
            "index `{}` is larger than {}",
            token, MAX_INDEX
        ))),
        _ => Err(Fault::Syntax(format!("index `{}` is not a number", token))),
    }
}

#[test]
fn test_index() {
    assert_eq!(index("32767"), Ok(32767));
    assert!(matches!(index("32768"), Err(Fault::Syntax(_))));
    assert!(matches!(index("-1"), Err(Fault::Syntax(_))));
    assert!(matches!(index("x1"), Err(Fault::Syntax(_))));
}

fn segment(token: &str) -> Result<Segment, Fault> {
    Segment::from_name(token).ok_or_else(|| Fault::Segment(format!("unknown segment `{}`", token)))
}

fn identifier(token: &str) -> Result<String, Fault> {
    all_consuming(symbol)(token)
        .map(|(_, sym)| sym)
        .map_err(|_| Fault::Syntax(format!("`{}` is not a valid identifier", token)))
}

fn label_name(token: &str) -> Result<String, Fault> {
    check_label(token)?;
    identifier(token)
}

fn procedure_name(token: &str) -> Result<String, Fault> {
    check_procedure(token)?;
    identifier(token)
}

#[test]
fn test_names() {
    assert_eq!(procedure_name("Main.fib"), Ok("Main.fib".to_string()));
    assert_eq!(label_name("WHILE_EXP0"), Ok("WHILE_EXP0".to_string()));
    assert!(matches!(label_name("1abc"), Err(Fault::Syntax(_))));
    assert!(matches!(label_name("a$b"), Err(Fault::Syntax(_))));
    assert!(matches!(procedure_name("a-b"), Err(Fault::Syntax(_))));
}

fn classify(line: &str) -> Result<Instruction, Fault> {
    let tokens = match words(line) {
        Ok(("", tokens)) => tokens,
        _ => return Err(Fault::Syntax("malformed instruction".to_string())),
    };
    let (keyword, operands) = match tokens.split_first() {
        Some(split) => split,
        None => return Err(Fault::Syntax("empty instruction".to_string())),
    };

    if let Some(op) = ArithmeticOp::from_name(keyword) {
        return match operands {
            [] => Ok(Arithmetic(op)),
            _ => Err(Fault::Arity(format!(
                "`{}` takes no operands, found {}",
                keyword,
                operands.len()
            ))),
        };
    }

    match (*keyword, operands) {
        ("push", [seg, idx]) => Ok(Push(segment(seg)?, index(idx)?)),
        ("pop", [seg, idx]) => match segment(seg)? {
            Constant => Err(Fault::Segment("cannot pop into the constant segment".to_string())),
            seg => Ok(Pop(seg, index(idx)?)),
        },
        ("push" | "pop", _) => Err(Fault::Syntax(format!(
            "`{}` expects a segment and an index",
            keyword
        ))),
        ("label", [sym]) => Ok(Label(label_name(sym)?)),
        ("goto", [sym]) => Ok(Goto(label_name(sym)?)),
        ("if-goto", [sym]) => Ok(IfGoto(label_name(sym)?)),
        ("label" | "goto" | "if-goto", _) => Err(Fault::Syntax(format!(
            "`{}` expects exactly one label",
            keyword
        ))),
        ("function", [sym, n]) => Ok(Function(procedure_name(sym)?, index(n)?)),
        ("call", [sym, n]) => Ok(Call(procedure_name(sym)?, index(n)?)),
        ("function" | "call", _) => Err(Fault::Syntax(format!(
            "`{}` expects a name and a count",
            keyword
        ))),
        ("return", []) => Ok(Return),
        ("return", _) => Err(Fault::Arity(format!(
            "`return` takes no operands, found {}",
            operands.len()
        ))),
        _ => Err(Fault::Syntax(format!("unknown instruction `{}`", keyword))),
    }
}

/// Reads one compilation unit. Comments and blank lines are dropped; the
/// first malformed instruction fails the whole unit.
pub fn parse(unit: &str, input: &str) -> Result<Vec<SourceLine>, TranslateError> {
    let mut lines = vec![];

    for (number, raw) in input.lines().enumerate() {
        let text = raw.split_once("//").map(|(s, _)| s).unwrap_or(raw).trim();
        if text.is_empty() {
            continue;
        }

        let instruction =
            classify(text).map_err(|fault| fault.locate(Location::new(unit, number + 1, text)))?;
        lines.push(SourceLine {
            instruction,
            line: number + 1,
            text: text.to_string(),
        });
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one(line: &str) -> Result<Instruction, TranslateError> {
        parse("Test", line).map(|mut lines| lines.remove(0).instruction)
    }

    #[test]
    fn classifies_every_kind() {
        assert_eq!(one("push  pointer  1").unwrap(), Push(Pointer, 1));
        assert_eq!(one("pop local 3").unwrap(), Pop(Local, 3));
        assert_eq!(one("neg").unwrap(), Arithmetic(ArithmeticOp::Neg));
        assert_eq!(one("label LOOP_START").unwrap(), Label("LOOP_START".into()));
        assert_eq!(one("goto END").unwrap(), Goto("END".into()));
        assert_eq!(one("if-goto IF_TRUE0").unwrap(), IfGoto("IF_TRUE0".into()));
        assert_eq!(one("function Main.fib 2").unwrap(), Function("Main.fib".into(), 2));
        assert_eq!(one("call Math.multiply 2").unwrap(), Call("Math.multiply".into(), 2));
        assert_eq!(one("return").unwrap(), Return);
    }

    #[test]
    fn strips_comments_and_blank_lines() {
        let src = "// header\n\n   push constant 7   // seven\n\t\nadd//sum\n";
        let lines = parse("Test", src).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].line, 3);
        assert_eq!(lines[0].text, "push constant 7");
        assert_eq!(lines[1].line, 5);
        assert_eq!(lines[1].instruction, Arithmetic(ArithmeticOp::Add));
    }

    #[test]
    fn rejects_unknown_segment() {
        let err = one("push bogus 0").unwrap_err();
        assert_eq!(err.category(), "segment");
        assert_eq!(err.location().unwrap().text, "push bogus 0");
    }

    #[test]
    fn rejects_pop_constant() {
        assert_eq!(one("pop constant 0").unwrap_err().category(), "segment");
    }

    #[test]
    fn rejects_negative_index_in_reader() {
        let err = one("push constant -1").unwrap_err();
        assert!(matches!(err, TranslateError::Parse { .. }));
    }

    #[test]
    fn rejects_wrong_token_counts() {
        assert_eq!(one("push constant").unwrap_err().category(), "syntax");
        assert_eq!(one("pop local 1 2").unwrap_err().category(), "syntax");
        assert_eq!(one("label").unwrap_err().category(), "syntax");
        assert_eq!(one("call Foo.bar").unwrap_err().category(), "syntax");
        assert_eq!(one("add 1").unwrap_err().category(), "arity");
        assert_eq!(one("return 0").unwrap_err().category(), "arity");
    }

    #[test]
    fn rejects_unknown_keyword_with_line_number() {
        let err = parse("Prog", "push constant 1\n\nmul\n").unwrap_err();
        let at = err.location().unwrap();
        assert_eq!(err.category(), "syntax");
        assert_eq!((at.unit.as_str(), at.line, at.text.as_str()), ("Prog", 3, "mul"));
    }

    #[test]
    fn rejects_labels_shadowing_return_addresses() {
        let err = one("label ret.0").unwrap_err();
        assert_eq!(err.category(), "syntax");
        assert_eq!(one("goto ret.3").unwrap_err().category(), "syntax");
        assert_eq!(one("if-goto ret.1").unwrap_err().category(), "syntax");
        assert_eq!(one("label ret").unwrap(), Label("ret".into()));
    }

    #[test]
    fn rejects_procedures_shadowing_comparison_labels() {
        assert_eq!(one("function TRUE_0 0").unwrap_err().category(), "syntax");
        assert_eq!(one("call DONE_12 0").unwrap_err().category(), "syntax");
    }

    #[test]
    fn rejects_procedures_shadowing_predefined_symbols() {
        for line in ["function SP 0", "function LCL 0", "call R13 0", "function SCREEN 0"] {
            assert_eq!(one(line).unwrap_err().category(), "syntax", "{}", line);
        }
    }

    #[test]
    fn rejects_procedures_shadowing_statics() {
        assert_eq!(one("function Main.0 0").unwrap_err().category(), "syntax");
    }

    #[test]
    fn rejects_scoping_separator_in_names() {
        assert_eq!(one("label a$b").unwrap_err().category(), "syntax");
        assert_eq!(one("function Foo$bar 0").unwrap_err().category(), "syntax");
    }
}
