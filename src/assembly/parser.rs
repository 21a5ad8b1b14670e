/*!
  The parser from assembly source text to the program AST. The grammar is
  self-delimiting: once a mnemonic is recognized, its operand shape says
  exactly how many operands follow, so no statement terminators are needed.
  Comments run from `;` to end of line. The whole input must parse; leftover
  text is a `SyntaxError`, never a partial success.
*/

use std::str::FromStr;

use nom::{
  branch::alt,
  bytes::complete::{tag, take_while},
  character::complete::{
    alpha1,
    char as one_char,
    digit1,
    space0,
    space1
  },
  combinator::{map, map_res, opt, recognize},
  error::ErrorKind,
  sequence::{delimited, pair, preceded, terminated},
  IResult
};
use string_cache::DefaultAtom;

use crate::cell::IntegerType;
use crate::error::SyntaxError;
use crate::machine::is_register;

use super::instruction::{
  Destination,
  Instruction,
  Location,
  Opcode,
  OperandShape,
  Source,
  Value
};

/// One declaration of a source program. Only the `Instruction` variant is
/// loaded into memory; the rest shape the symbol table or reserve data.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Declaration {
  Label(DefaultAtom),
  Byte(IntegerType),
  Word(IntegerType),
  Value(Value),
  Instruction(Instruction)
}

impl std::fmt::Display for Declaration{
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self{
      Declaration::Label(name)             => write!(f, "{}:", name),
      Declaration::Byte(count)             => write!(f, ".byte {}", count),
      Declaration::Word(count)             => write!(f, ".word {}", count),
      Declaration::Value(value)            => write!(f, ".value {}", value),
      Declaration::Instruction(instruction) => write!(f, "{}", instruction)
    }
  }
}

/**
  Parses a whole source program into its declaration list.

  The top level walks declarations one at a time, skipping whitespace and
  comments between them. Any text that cannot begin a declaration fails the
  whole parse with a line-numbered `SyntaxError`.
*/
pub fn parse(source: &str) -> Result<Vec<Declaration>, SyntaxError> {
  let mut declarations = Vec::new();
  let mut rest = skip_trivia(source);

  while !rest.is_empty() {
    match declaration(rest) {

      Ok((remaining, parsed)) => {
        declarations.push(parsed);
        rest = skip_trivia(remaining);
      }

      Err(_e) => {
        return Err(classify_failure(source, rest, declarations.is_empty()));
      }

    }
  }

  Ok(declarations)
}

/// Consumes leading whitespace, newlines, and `;` comments.
fn skip_trivia(mut input: &str) -> &str {
  loop {
    let trimmed = input.trim_start();
    if !trimmed.starts_with(';') {
      return trimmed;
    }
    match trimmed.find('\n') {
      Some(eol) => { input = &trimmed[eol + 1..]; }
      None      => { return ""; }
    }
  }
}

/// Decides which `SyntaxError` to report for the text the parser stopped at.
fn classify_failure(source: &str, rest: &str, nothing_parsed: bool) -> SyntaxError {
  let line = line_number(source, rest);

  if let Ok((after, name)) = identifier(rest) {
    let looks_like_label = skip_trivia(after).starts_with(':');
    if Opcode::from_str(name).is_err() && !looks_like_label {
      return SyntaxError::UnknownMnemonic { line, name: name.to_string() };
    }
    return SyntaxError::MalformedDeclaration { line, near: near(rest) };
  }

  match nothing_parsed {
    true  => SyntaxError::MalformedDeclaration { line, near: near(rest) },
    false => SyntaxError::TrailingInput { line, near: near(rest) }
  }
}

fn line_number(source: &str, rest: &str) -> u32 {
  let consumed = source.len() - rest.len();
  source[..consumed].matches('\n').count() as u32 + 1
}

fn near(rest: &str) -> String {
  rest.lines().next().unwrap_or("").chars().take(24).collect()
}

// region Declaration parsers

fn declaration(input: &str) -> IResult<&str, Declaration> {
  alt((
    label,
    directive,
    map(instruction, Declaration::Instruction)
  ))(input)
}

fn label(input: &str) -> IResult<&str, Declaration> {
  map(
    terminated(identifier, pair(space0, one_char(':'))),
    |name| { Declaration::Label(DefaultAtom::from(name)) }
  )(input)
}

fn directive(input: &str) -> IResult<&str, Declaration> {
  preceded(
    one_char('.'),
    alt((
      map(preceded(pair(tag("byte"), space1), integer), Declaration::Byte),
      map(preceded(pair(tag("word"), space1), integer), Declaration::Word),
      map(preceded(pair(tag("value"), space1), value), Declaration::Value)
    ))
  )(input)
}

/// Reads a mnemonic, then exactly the operands its shape demands.
fn instruction(input: &str) -> IResult<&str, Instruction> {
  let (rest, mnemonic) = identifier(input)?;

  let opcode = match Opcode::from_str(mnemonic) {
    Ok(opcode) => opcode,
    Err(_)     => { return Err(nom::Err::Error((input, ErrorKind::Tag))); }
  };

  match opcode.shape() {

    OperandShape::SourceTarget => {
      let (rest, source) = preceded(space1, source)(rest)?;
      let (rest, target) = preceded(space1, destination)(rest)?;
      Ok((rest, Instruction::SourceTarget { opcode, source, target }))
    }

    OperandShape::SourceOnly => {
      let (rest, source) = preceded(space1, source)(rest)?;
      Ok((rest, Instruction::SourceOnly { opcode, source }))
    }

    OperandShape::TargetOnly => {
      let (rest, target) = preceded(space1, destination)(rest)?;
      Ok((rest, Instruction::TargetOnly { opcode, target }))
    }

    OperandShape::Transfer => {
      let (rest, target) = preceded(space1, value)(rest)?;
      Ok((rest, Instruction::Transfer { opcode, target }))
    }

    OperandShape::Nullary => {
      Ok((rest, Instruction::Nullary(opcode)))
    }

  }
}

// endregion

// region Operand parsers

fn identifier(input: &str) -> IResult<&str, &str> {
  recognize(
    pair(
      alpha1,
      take_while(|c: char| { c.is_ascii_alphanumeric() || c == '_' })
    )
  )(input)
}

fn integer(input: &str) -> IResult<&str, IntegerType> {
  map_res(
    recognize(pair(opt(one_char('-')), digit1)),
    str::parse
  )(input)
}

/// A non-negative numeral, used where a leading `-` would be read as a
/// decrement mark instead.
fn unsigned_integer(input: &str) -> IResult<&str, IntegerType> {
  map_res(digit1, str::parse)(input)
}

/// A value is tagged symbolic or literal here, at parse time; the renderer and
/// every later stage trust the tag.
fn value(input: &str) -> IResult<&str, Value> {
  alt((
    map(integer, Value::Literal),
    map(identifier, |name| { Value::Symbolic(DefaultAtom::from(name)) })
  ))(input)
}

/// An identifier in operand position is a register exactly when it names one
/// of the machine's registers; anything else is a symbolic value.
fn register_or_value(name: &str) -> Result<DefaultAtom, Value> {
  match is_register(name) {
    true  => Ok(DefaultAtom::from(name)),
    false => Err(Value::Symbolic(DefaultAtom::from(name)))
  }
}

fn location(input: &str) -> IResult<&str, Location> {
  alt((
    map(integer, |n| { Location::Value(Value::Literal(n)) }),
    map(identifier, |name| {
      match register_or_value(name) {
        Ok(register) => Location::Register(register),
        Err(symbol)  => Location::Value(symbol)
      }
    })
  ))(input)
}

fn parenthesized_location(input: &str) -> IResult<&str, Location> {
  delimited(
    pair(one_char('('), space0),
    location,
    pair(space0, one_char(')'))
  )(input)
}

/**
  A destination in one of its eight forms. The parenthesized forms share a
  prefix, so the suffix after `)` decides among post-increment, post-decrement,
  indexed, and plain indirect. Suffixes are juxtaposed: `(SP)+`, `(SP)2`,
  `(SP)limit`.
*/
fn destination(input: &str) -> IResult<&str, Destination> {
  alt((
    map(preceded(one_char('+'), parenthesized_location), Destination::PreIncrement),
    map(preceded(one_char('-'), parenthesized_location), Destination::PreDecrement),
    parenthesized_destination,
    map(integer, |n| { Destination::Value(Value::Literal(n)) }),
    map(identifier, |name| {
      match register_or_value(name) {
        Ok(register) => Destination::Register(register),
        Err(symbol)  => Destination::Value(symbol)
      }
    })
  ))(input)
}

fn parenthesized_destination(input: &str) -> IResult<&str, Destination> {
  let (rest, location) = parenthesized_location(input)?;

  if let Ok((rest, _)) = one_char::<_, (&str, ErrorKind)>('+')(rest) {
    return Ok((rest, Destination::PostIncrement(location)));
  }
  if let Ok((rest, _)) = one_char::<_, (&str, ErrorKind)>('-')(rest) {
    return Ok((rest, Destination::PostDecrement(location)));
  }
  if let Ok((rest, offset)) = offset_value(rest) {
    return Ok((rest, Destination::Indexed(location, offset)));
  }

  Ok((rest, Destination::Indirect(location)))
}

fn offset_value(input: &str) -> IResult<&str, Value> {
  alt((
    map(unsigned_integer, Value::Literal),
    map(identifier, |name| { Value::Symbolic(DefaultAtom::from(name)) })
  ))(input)
}

fn source(input: &str) -> IResult<&str, Source> {
  alt((
    map(preceded(one_char('#'), value), Source::Immediate),
    map(destination, Source::Operand)
  ))(input)
}

// endregion


#[cfg(test)]
mod tests {
  use super::*;

  fn acc() -> Destination {
    Destination::Register(DefaultAtom::from("ACC"))
  }

  #[test]
  fn parses_each_operand_shape() {
    let program = "MOVE #1 ACC\nPUSH ACC\nREAD ACC\nJUMP top\nHALT";
    let declarations = parse(program).unwrap();

    assert_eq!(declarations.len(), 5);
    assert_eq!(
      declarations[0],
      Declaration::Instruction(Instruction::SourceTarget {
        opcode: Opcode::Move,
        source: Source::Immediate(Value::Literal(1)),
        target: acc()
      })
    );
    assert_eq!(
      declarations[3],
      Declaration::Instruction(Instruction::Transfer {
        opcode: Opcode::Jump,
        target: Value::Symbolic(DefaultAtom::from("top"))
      })
    );
    assert_eq!(
      declarations[4],
      Declaration::Instruction(Instruction::Nullary(Opcode::Halt))
    );
  }

  #[test]
  fn parses_labels_and_directives() {
    let program = "top:\n.byte 4\n.word 2\n.value -7\nloop: NOP";
    let declarations = parse(program).unwrap();

    assert_eq!(declarations[0], Declaration::Label(DefaultAtom::from("top")));
    assert_eq!(declarations[1], Declaration::Byte(4));
    assert_eq!(declarations[2], Declaration::Word(2));
    assert_eq!(declarations[3], Declaration::Value(Value::Literal(-7)));
    assert_eq!(declarations[4], Declaration::Label(DefaultAtom::from("loop")));
    assert_eq!(declarations[5], Declaration::Instruction(Instruction::Nullary(Opcode::Nop)));
  }

  #[test]
  fn destination_forms_round_trip_through_text() {
    let forms = [
      "ACC", "12", "(ACC)2", "(ACC)+", "(ACC)-", "+(ACC)", "-(ACC)", "(ACC)",
      "(7)", "(SP)limit"
    ];
    for form in forms.iter() {
      let (rest, parsed) = destination(form).unwrap();
      assert_eq!(rest, "", "leftover parsing {}", form);
      assert_eq!(&format!("{}", parsed), form);
    }
  }

  #[test]
  fn sources_accept_immediates_and_destination_forms() {
    let (_, immediate) = source("#count").unwrap();
    assert_eq!(immediate, Source::Immediate(Value::Symbolic(DefaultAtom::from("count"))));

    let (_, indirect) = source("(SP)+").unwrap();
    assert_eq!(
      indirect,
      Source::Operand(Destination::PostIncrement(Location::Register(DefaultAtom::from("SP"))))
    );
  }

  #[test]
  fn comments_and_blank_lines_are_trivia() {
    let program = "; a program\n\n  MOVE #0 ACC   ; zero the accumulator\n\nHALT ; done\n";
    let declarations = parse(program).unwrap();
    assert_eq!(declarations.len(), 2);
  }

  #[test]
  fn unknown_mnemonics_are_reported_with_their_line() {
    let program = "MOVE #1 ACC\nFROB ACC\n";
    assert_eq!(
      parse(program),
      Err(SyntaxError::UnknownMnemonic { line: 2, name: "FROB".to_string() })
    );
  }

  #[test]
  fn malformed_operands_fail_the_parse() {
    let result = parse("MOVE #1\nHALT");
    assert!(matches!(result, Err(SyntaxError::MalformedDeclaration { line: 1, .. })));
  }

  #[test]
  fn trailing_tokens_fail_the_parse() {
    let result = parse("HALT\n)(");
    assert!(matches!(result, Err(SyntaxError::TrailingInput { line: 2, .. })));
  }
}
