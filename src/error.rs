/*!
  Error values for loading and running programs. Loading failures carry the line
  or symbol that caused them and render as human readable messages. A failed
  load never yields a usable machine.
*/

use std::fmt::{Display, Formatter};

use string_cache::DefaultAtom;

use crate::cell::CellKind;

/// A failure of the lexer/parser. The whole input must parse; anything left
/// over is an error, not a partial success.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum SyntaxError {
  UnknownMnemonic{
    line: u32,
    name: String
  },
  MalformedDeclaration{
    line: u32,
    near: String
  },
  TrailingInput{
    line: u32,
    near: String
  }
}

impl Display for SyntaxError{
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self{

      SyntaxError::UnknownMnemonic {line, name} => {
        write!(f, "Error on line {}: {} is not an instruction.", line, name)
      }

      SyntaxError::MalformedDeclaration {line, near} => {
        write!(f, "Error on line {}: malformed declaration near `{}`.", line, near)
      }

      SyntaxError::TrailingInput {line, near} => {
        write!(f, "Error on line {}: expected end of program, found `{}`.", line, near)
      }

    }
  }
}

/// A static rule broken by an otherwise well-formed program. The verifier
/// collects every violation rather than stopping at the first.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Violation {
  DuplicateLabel{
    name: DefaultAtom
  },
  /// Two labels naming the same address. The symbol table is bijective, so a
  /// second name for an address cannot be recorded.
  AliasedLabel{
    name: DefaultAtom,
    address: usize
  },
  UnknownRegister{
    name: DefaultAtom
  },
  /// An increment/decrement addressing mode applied to a literal location.
  LiteralIncrement{
    operand: String
  },
  ProgramTooLarge{
    count: usize,
    capacity: usize
  }
}

impl Display for Violation{
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self{

      Violation::DuplicateLabel {name} => {
        write!(f, "the label {} is declared more than once", name)
      }

      Violation::AliasedLabel {name, address} => {
        write!(f, "the label {} aliases address {}, which already has a label", name, address)
      }

      Violation::UnknownRegister {name} => {
        write!(f, "{} is not a register of this machine", name)
      }

      Violation::LiteralIncrement {operand} => {
        write!(f, "the operand {} increments or decrements a literal location", operand)
      }

      Violation::ProgramTooLarge {count, capacity} => {
        write!(f, "the program has {} instructions but memory holds only {}", count, capacity)
      }

    }
  }
}

/// Why a call to `loader::load` produced no machine.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum LoadError {
  Syntax(SyntaxError),
  Unresolved{
    name: DefaultAtom
  },
  Verification(Vec<Violation>)
}

impl Display for LoadError{
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self{

      LoadError::Syntax(e) => {
        write!(f, "{}", e)
      }

      LoadError::Unresolved {name} => {
        write!(f, "Error: the symbol {} is referenced but never declared.", name)
      }

      LoadError::Verification(violations) => {
        write!(
          f,
          "Verification failed:\n{}",
          violations
            .iter()
            .map(|v| { format!("  {}", v) })
            .collect::<Vec<String>>()
            .join("\n")
        )
      }

    }
  }
}

impl From<SyntaxError> for LoadError{
  fn from(e: SyntaxError) -> LoadError{
    LoadError::Syntax(e)
  }
}

/// A failure while reading machine state or executing an instruction. All are
/// fatal to the run; the engine performs no recovery.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum MachineError {
  /// A cell was accessed as a variant it does not hold.
  TypeMismatch{
    expected: CellKind,
    found: CellKind
  },
  /// A computed address fell outside `[0, capacity)`.
  OutOfRange{
    address: i64,
    capacity: usize
  },
  DivisionByZero,
  /// A `READ` was executed with nothing left on the input queue.
  InputExhausted,
  /// A symbolic value survived to execution without a binding. The resolver
  /// guarantees this cannot happen for loaded programs.
  UnboundSymbol(DefaultAtom)
}

impl Display for MachineError{
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self{

      MachineError::TypeMismatch {expected, found} => {
        write!(f, "Error: expected a {} cell but found a {} cell.", expected, found)
      }

      MachineError::OutOfRange {address, capacity} => {
        write!(f, "Error: address {} is outside memory of {} cells.", address, capacity)
      }

      MachineError::DivisionByZero => {
        write!(f, "Error: division by zero.")
      }

      MachineError::InputExhausted => {
        write!(f, "Error: READ executed with an empty input queue.")
      }

      MachineError::UnboundSymbol(name) => {
        write!(f, "Error: the symbol {} has no address.", name)
      }

    }
  }
}
