/*!
  The symbol table maps label names to the memory addresses of the
  instructions they precede. It is a convenience wrapper around a `BiMap`, so
  the mapping is bijective in both directions: a name binds one address, and
  an address carries at most one name. The reverse direction is what lets a
  dump annotate an address with the label the programmer wrote.

  The three analysis stages of the load pipeline live here too: `build`
  collects the bindings, `resolve` checks every symbolic operand against them,
  and `verify` enforces the machine's static rules.
*/

use std::fmt::{Display, Formatter};

use bimap::BiMap;
use string_cache::DefaultAtom;

use crate::assembly::{Declaration, Destination, Instruction, Location, Source, Value};
use crate::error::{LoadError, Violation};
use crate::machine::{is_register, MachineConfig, TABLE_DISPLAY_FORMAT};

#[derive(Clone, Debug)]
pub struct SymbolTable{
  table: BiMap<DefaultAtom, usize>
}

impl SymbolTable{

  pub fn new() -> SymbolTable {
    SymbolTable {
      table: BiMap::new()
    }
  }

  pub fn address_of(&self, name: &DefaultAtom) -> Option<usize> {
    self.table.get_by_left(name).copied()
  }

  pub fn label_at(&self, address: usize) -> Option<&DefaultAtom> {
    self.table.get_by_right(&address)
  }

  pub fn is_empty(&self) -> bool {
    self.table.len() == 0
  }

}

/// A symbol table whose bindings are known to cover every symbolic reference
/// in the program it was built from. Only `resolve` creates one.
#[derive(Clone, Debug)]
pub struct ResolvedTable(SymbolTable);

impl ResolvedTable{

  /// The table of a machine with nothing loaded.
  pub fn empty() -> ResolvedTable {
    ResolvedTable(SymbolTable::new())
  }

  pub fn address_of(&self, name: &DefaultAtom) -> Option<usize> {
    self.0.address_of(name)
  }

  pub fn label_at(&self, address: usize) -> Option<&DefaultAtom> {
    self.0.label_at(address)
  }

}

/**
  Builds the symbol table from a parsed program. Each label binds to the index
  of the next instruction declaration; a label after the last instruction
  binds to the address one past the code region, where execution would fall
  through to. Non-code declarations occupy no address.

  Bindings the bimap cannot hold, a name declared twice or a second name for
  one address, are recorded as violations for the verifier to report; the
  first binding wins in the meantime.
*/
pub fn build(declarations: &[Declaration]) -> (SymbolTable, Vec<Violation>) {
  let mut table = BiMap::new();
  let mut violations = Vec::new();
  let mut next_instruction: usize = 0;

  for declaration in declarations {
    match declaration {

      Declaration::Label(name) => {
        if table.get_by_left(name).is_some() {
          violations.push(Violation::DuplicateLabel { name: name.clone() });
        } else if table.get_by_right(&next_instruction).is_some() {
          violations.push(Violation::AliasedLabel {
            name: name.clone(),
            address: next_instruction
          });
        } else {
          let _ = table.insert_no_overwrite(name.clone(), next_instruction);
        }
      }

      Declaration::Instruction(_) => {
        next_instruction += 1;
      }

      _declaration => {} // Directives occupy no address.

    }
  }

  (SymbolTable { table }, violations)
}

/**
  Checks that every symbolic value in the program is bound by the table.
  Succeeds with the table marked resolved; fails with the first unresolved
  name. A program that resolves can be loaded and executed without ever
  meeting an unbound symbol.
*/
pub fn resolve(
  declarations: &[Declaration],
  table: SymbolTable
) -> Result<ResolvedTable, LoadError>
{
  for declaration in declarations {
    match declaration {

      Declaration::Instruction(instruction) => {
        resolve_instruction(instruction, &table)?;
      }

      Declaration::Value(value) => {
        resolve_value(value, &table)?;
      }

      _declaration => {}

    }
  }

  Ok(ResolvedTable(table))
}

fn resolve_instruction(instruction: &Instruction, table: &SymbolTable)
  -> Result<(), LoadError>
{
  match instruction {

    Instruction::SourceTarget { source, target, .. } => {
      resolve_source(source, table)?;
      resolve_destination(target, table)
    }

    Instruction::SourceOnly { source, .. } => {
      resolve_source(source, table)
    }

    Instruction::TargetOnly { target, .. } => {
      resolve_destination(target, table)
    }

    Instruction::Transfer { target, .. } => {
      resolve_value(target, table)
    }

    Instruction::Nullary(_) => Ok(())

  }
}

fn resolve_source(source: &Source, table: &SymbolTable) -> Result<(), LoadError> {
  match source {
    Source::Operand(destination) => resolve_destination(destination, table),
    Source::Immediate(value)     => resolve_value(value, table)
  }
}

fn resolve_destination(destination: &Destination, table: &SymbolTable)
  -> Result<(), LoadError>
{
  match destination {

    Destination::Register(_) => Ok(()),

    Destination::Value(value) => resolve_value(value, table),

    Destination::Indexed(location, offset) => {
      resolve_location(location, table)?;
      resolve_value(offset, table)
    }

    | Destination::PostIncrement(location)
    | Destination::PostDecrement(location)
    | Destination::PreIncrement(location)
    | Destination::PreDecrement(location)
    | Destination::Indirect(location) => {
      resolve_location(location, table)
    }

  }
}

fn resolve_location(location: &Location, table: &SymbolTable) -> Result<(), LoadError> {
  match location {
    Location::Register(_)  => Ok(()),
    Location::Value(value) => resolve_value(value, table)
  }
}

fn resolve_value(value: &Value, table: &SymbolTable) -> Result<(), LoadError> {
  match value {

    Value::Symbolic(name) if table.address_of(name).is_none() => {
      Err(LoadError::Unresolved { name: name.clone() })
    }

    _value => Ok(())

  }
}

/**
  Verifies the resolved program against the machine's static rules: the
  builder's deferred label violations, register names outside the
  architectural set, increment/decrement addressing of a literal location, and
  a program longer than memory. Every violation is collected; one error
  reports them all.
*/
pub fn verify(
  declarations: &[Declaration],
  build_violations: Vec<Violation>,
  config: &MachineConfig
) -> Result<(), LoadError>
{
  let mut violations = build_violations;

  let code_size =
    declarations
      .iter()
      .filter(|d| matches!(d, Declaration::Instruction(_)))
      .count();
  if code_size > config.capacity {
    violations.push(Violation::ProgramTooLarge {
      count: code_size,
      capacity: config.capacity
    });
  }

  for declaration in declarations {
    if let Declaration::Instruction(instruction) = declaration {
      verify_instruction(instruction, &mut violations);
    }
  }

  match violations.is_empty() {
    true  => Ok(()),
    false => Err(LoadError::Verification(violations))
  }
}

fn verify_instruction(instruction: &Instruction, violations: &mut Vec<Violation>) {
  match instruction {

    Instruction::SourceTarget { source, target, .. } => {
      verify_source(source, violations);
      verify_destination(target, violations);
    }

    Instruction::SourceOnly { source, .. } => {
      verify_source(source, violations);
    }

    Instruction::TargetOnly { target, .. } => {
      verify_destination(target, violations);
    }

    | Instruction::Transfer { .. }
    | Instruction::Nullary(_) => {}

  }
}

fn verify_source(source: &Source, violations: &mut Vec<Violation>) {
  match source {
    Source::Operand(destination) => verify_destination(destination, violations),
    Source::Immediate(_)         => {}
  }
}

fn verify_destination(destination: &Destination, violations: &mut Vec<Violation>) {
  match destination {

    Destination::Register(name) => {
      verify_register(name, violations);
    }

    Destination::Value(_) => {}

    Destination::Indexed(location, _offset) => {
      verify_location(location, violations);
    }

    | Destination::PostIncrement(location)
    | Destination::PostDecrement(location)
    | Destination::PreIncrement(location)
    | Destination::PreDecrement(location) => {
      verify_location(location, violations);
      if let Location::Value(_) = location {
        violations.push(Violation::LiteralIncrement {
          operand: format!("{}", destination)
        });
      }
    }

    Destination::Indirect(location) => {
      verify_location(location, violations);
    }

  }
}

fn verify_location(location: &Location, violations: &mut Vec<Violation>) {
  if let Location::Register(name) = location {
    verify_register(name, violations);
  }
}

fn verify_register(name: &DefaultAtom, violations: &mut Vec<Violation>) {
  if !is_register(&name[..]) {
    violations.push(Violation::UnknownRegister { name: name.clone() });
  }
}

impl Display for SymbolTable{
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    if self.is_empty() {
      return write!(f, "Symbols: (none)");
    }

    let mut entries: Vec<(&DefaultAtom, &usize)> = self.table.iter().collect();
    entries.sort_by_key(|(_name, address)| **address);

    let mut table = prettytable::Table::new();
    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubl->"Symbol", ubr->"Address"]);
    for (name, address) in entries {
      table.add_row(row![l->name, r->address]);
    }
    write!(f, "{}", table)
  }
}

impl Display for ResolvedTable{
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::assembly::parse;

  fn atom(name: &str) -> DefaultAtom {
    DefaultAtom::from(name)
  }

  #[test]
  fn labels_bind_to_the_next_instruction() {
    let declarations =
      parse("start: MOVE #1 ACC\nloop: ADD #1 ACC\nJUMP loop\nend:").unwrap();
    let (table, violations) = build(&declarations);

    assert!(violations.is_empty());
    assert_eq!(table.address_of(&atom("start")), Some(0));
    assert_eq!(table.address_of(&atom("loop")), Some(1));
    // A trailing label binds one past the last instruction.
    assert_eq!(table.address_of(&atom("end")), Some(3));
    assert_eq!(table.label_at(1), Some(&atom("loop")));
  }

  #[test]
  fn duplicate_labels_are_deferred_violations() {
    let declarations = parse("a: NOP\na: HALT").unwrap();
    let (_table, violations) = build(&declarations);
    assert_eq!(violations, vec![Violation::DuplicateLabel { name: atom("a") }]);
  }

  #[test]
  fn aliased_labels_are_deferred_violations() {
    let declarations = parse("a: b: NOP").unwrap();
    let (table, violations) = build(&declarations);
    assert_eq!(table.address_of(&atom("a")), Some(0));
    assert_eq!(
      violations,
      vec![Violation::AliasedLabel { name: atom("b"), address: 0 }]
    );
  }

  #[test]
  fn resolve_accepts_bound_symbols_and_rejects_free_ones() {
    let declarations = parse("top: JUMP top").unwrap();
    let (table, _) = build(&declarations);
    assert!(resolve(&declarations, table).is_ok());

    let unbound = parse("JUMP nowhere").unwrap();
    let (table, _) = build(&unbound);
    match resolve(&unbound, table) {
      Err(LoadError::Unresolved { name }) => assert_eq!(name, atom("nowhere")),
      other => panic!("expected an unresolved-symbol error, got {:?}", other)
    }
  }

  #[test]
  fn verify_rejects_unknown_registers() {
    use crate::assembly::{Instruction, Opcode};

    let declarations = vec![
      Declaration::Instruction(Instruction::TargetOnly {
        opcode: Opcode::Clear,
        target: Destination::Register(atom("R1"))
      })
    ];
    let result = verify(&declarations, vec![], &MachineConfig::default());
    assert_eq!(
      result,
      Err(LoadError::Verification(vec![
        Violation::UnknownRegister { name: atom("R1") }
      ]))
    );
  }

  #[test]
  fn verify_rejects_literal_increments() {
    let declarations = parse("CLEAR +(3)").unwrap();
    let result = verify(&declarations, vec![], &MachineConfig::default());
    match result {
      Err(LoadError::Verification(violations)) => {
        assert_eq!(
          violations,
          vec![Violation::LiteralIncrement { operand: "+(3)".to_string() }]
        );
      }
      other => panic!("expected a verification error, got {:?}", other)
    }
  }

  #[test]
  fn verify_rejects_programs_larger_than_memory() {
    let declarations = parse("NOP\nNOP\nNOP").unwrap();
    let config = MachineConfig { capacity: 2, ..MachineConfig::default() };
    let result = verify(&declarations, vec![], &config);
    assert_eq!(
      result,
      Err(LoadError::Verification(vec![
        Violation::ProgramTooLarge { count: 3, capacity: 2 }
      ]))
    );
  }
}
