use std::fmt::{Display, Formatter};

use string_cache::DefaultAtom;
use strum_macros::{Display as StrumDisplay, EnumString, IntoStaticStr};

use crate::cell::IntegerType;

/**
  Mnemonics of the virtual machine.

  The operand shape of an instruction is a total function of its mnemonic, so
  the parser can decide how many operands to read the moment it has recognized
  the keyword. `Opcode::shape()` encodes that function; keep it in sync when
  adding a mnemonic.
*/
#[derive(
StrumDisplay, IntoStaticStr, EnumString,
Clone,        Copy,          Eq, PartialEq, Debug, Hash
)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Opcode {
  // Source and destination //
  Move,              // MOVE src dst
  Add,               // ADD src dst
  Sub,               // SUB src dst
  Mult,              // MULT src dst
  Div,               // DIV src dst

  // Source only //
  Push,              // PUSH src
  Write,             // WRITE src

  // Destination only //
  Pop,               // POP dst
  Read,              // READ dst
  Clear,             // CLEAR dst

  // Control transfer //
  Jump,              // JUMP target
  Jzero,             // JZERO target
  Jneg,              // JNEG target
  Call,              // CALL target

  // Zero-operand //
  Return,            // return
  Halt,              // halt
  Nop                // nop
}

/// The operand combination a mnemonic takes.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum OperandShape {
  SourceTarget,
  SourceOnly,
  TargetOnly,
  Transfer,
  Nullary
}

impl Opcode{
  pub fn shape(&self) -> OperandShape {
    match self{

      | Opcode::Move
      | Opcode::Add
      | Opcode::Sub
      | Opcode::Mult
      | Opcode::Div    => OperandShape::SourceTarget,

      | Opcode::Push
      | Opcode::Write  => OperandShape::SourceOnly,

      | Opcode::Pop
      | Opcode::Read
      | Opcode::Clear  => OperandShape::TargetOnly,

      | Opcode::Jump
      | Opcode::Jzero
      | Opcode::Jneg
      | Opcode::Call   => OperandShape::Transfer,

      | Opcode::Return
      | Opcode::Halt
      | Opcode::Nop    => OperandShape::Nullary

    }
  }
}

/// A value names either a symbol or a numeral. The renderer trusts this tag;
/// it never infers one form from the other.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum Value {
  Symbolic(DefaultAtom),
  Literal(IntegerType)
}

/// What can appear inside addressing parentheses.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum Location {
  Register(DefaultAtom),
  Value(Value)
}

/// A destination operand: one of the seven addressing forms plus a bare
/// register or value.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum Destination {
  Register(DefaultAtom),
  Value(Value),
  /// `(<location>)<offset>`
  Indexed(Location, Value),
  /// `(<location>)+`
  PostIncrement(Location),
  /// `(<location>)-`
  PostDecrement(Location),
  /// `+(<location>)`
  PreIncrement(Location),
  /// `-(<location>)`
  PreDecrement(Location),
  /// `(<location>)`
  Indirect(Location)
}

/// A source operand is any destination form, or an immediate `#<value>`.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum Source {
  Operand(Destination),
  Immediate(Value)
}

/// A decoded instruction, one variant per operand shape. Every instruction
/// occupies exactly one memory cell.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum Instruction {
  SourceTarget{
    opcode: Opcode,
    source: Source,
    target: Destination
  },
  SourceOnly{
    opcode: Opcode,
    source: Source
  },
  TargetOnly{
    opcode: Opcode,
    target: Destination
  },
  Transfer{
    opcode: Opcode,
    target: Value
  },
  Nullary(Opcode)
}

impl Instruction{
  pub fn opcode(&self) -> Opcode {
    match self{
      | Instruction::SourceTarget {opcode, ..}
      | Instruction::SourceOnly   {opcode, ..}
      | Instruction::TargetOnly   {opcode, ..}
      | Instruction::Transfer     {opcode, ..} => *opcode,
      Instruction::Nullary(opcode)             => *opcode
    }
  }
}

// region Rendering
//
// Disassembly back to canonical assembly syntax. Pure and total: every
// well-formed operand has exactly one text form, with one case per variant.

impl Display for Value{
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self{

      Value::Symbolic(name) => {
        write!(f, "{}", name)
      }

      Value::Literal(number) => {
        write!(f, "{}", number)
      }

    }
  }
}

impl Display for Location{
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self{

      Location::Register(name) => {
        write!(f, "{}", name)
      }

      Location::Value(value) => {
        write!(f, "{}", value)
      }

    }
  }
}

impl Display for Destination{
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self{

      Destination::Register(name) => {
        write!(f, "{}", name)
      }

      Destination::Value(value) => {
        write!(f, "{}", value)
      }

      Destination::Indexed(location, offset) => {
        write!(f, "({}){}", location, offset)
      }

      Destination::PostIncrement(location) => {
        write!(f, "({})+", location)
      }

      Destination::PostDecrement(location) => {
        write!(f, "({})-", location)
      }

      Destination::PreIncrement(location) => {
        write!(f, "+({})", location)
      }

      Destination::PreDecrement(location) => {
        write!(f, "-({})", location)
      }

      Destination::Indirect(location) => {
        write!(f, "({})", location)
      }

    }
  }
}

impl Display for Source{
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self{

      Source::Operand(destination) => {
        write!(f, "{}", destination)
      }

      Source::Immediate(value) => {
        write!(f, "#{}", value)
      }

    }
  }
}

impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self{

      Instruction::SourceTarget {opcode, source, target} => {
        write!(f, "{} {} {}", opcode, source, target)
      }

      Instruction::SourceOnly {opcode, source} => {
        write!(f, "{} {}", opcode, source)
      }

      Instruction::TargetOnly {opcode, target} => {
        write!(f, "{} {}", opcode, target)
      }

      Instruction::Transfer {opcode, target} => {
        write!(f, "{} {}", opcode, target)
      }

      Instruction::Nullary(opcode) => {
        write!(f, "{}", opcode)
      }

    }
  }
}

// endregion


#[cfg(test)]
mod tests {
  use super::*;
  use std::str::FromStr;

  fn register(name: &str) -> Destination {
    Destination::Register(DefaultAtom::from(name))
  }

  fn acc_location() -> Location {
    Location::Register(DefaultAtom::from("ACC"))
  }

  #[test]
  fn mnemonics_render_uppercase() {
    assert_eq!(format!("{}", Opcode::Move), "MOVE");
    assert_eq!(format!("{}", Opcode::Jzero), "JZERO");
    assert_eq!(Opcode::from_str("HALT"), Ok(Opcode::Halt));
    assert!(Opcode::from_str("FROB").is_err());
  }

  #[test]
  fn immediate_add_renders_exactly() {
    let instruction =
      Instruction::SourceTarget {
        opcode: Opcode::Add,
        source: Source::Immediate(Value::Literal(3)),
        target: register("R1")
      };
    assert_eq!(format!("{}", instruction), "ADD #3 R1");
  }

  #[test]
  fn every_destination_form_renders_its_syntax() {
    let cases: Vec<(Destination, &str)> = vec![
      (register("ACC"), "ACC"),
      (Destination::Value(Value::Literal(12)), "12"),
      (Destination::Indexed(acc_location(), Value::Literal(2)), "(ACC)2"),
      (Destination::PostIncrement(acc_location()), "(ACC)+"),
      (Destination::PostDecrement(acc_location()), "(ACC)-"),
      (Destination::PreIncrement(acc_location()), "+(ACC)"),
      (Destination::PreDecrement(acc_location()), "-(ACC)"),
      (Destination::Indirect(acc_location()), "(ACC)"),
    ];
    for (destination, expected) in cases {
      assert_eq!(format!("{}", destination), expected);
    }
  }

  #[test]
  fn locations_and_symbols_render() {
    assert_eq!(
      format!("{}", Destination::Indirect(Location::Value(Value::Literal(7)))),
      "(7)"
    );
    assert_eq!(
      format!("{}", Source::Immediate(Value::Symbolic(DefaultAtom::from("limit")))),
      "#limit"
    );
  }

  #[test]
  fn transfer_and_nullary_render() {
    let jump =
      Instruction::Transfer {
        opcode: Opcode::Jzero,
        target: Value::Symbolic(DefaultAtom::from("done"))
      };
    assert_eq!(format!("{}", jump), "JZERO done");
    assert_eq!(format!("{}", Instruction::Nullary(Opcode::Halt)), "HALT");
  }

  #[test]
  fn shapes_cover_every_mnemonic() {
    assert_eq!(Opcode::Move.shape(), OperandShape::SourceTarget);
    assert_eq!(Opcode::Write.shape(), OperandShape::SourceOnly);
    assert_eq!(Opcode::Read.shape(), OperandShape::TargetOnly);
    assert_eq!(Opcode::Call.shape(), OperandShape::Transfer);
    assert_eq!(Opcode::Nop.shape(), OperandShape::Nullary);
  }
}
