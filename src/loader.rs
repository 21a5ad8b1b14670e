/*!

  The loader turns assembly source text into a machine that is ready to run.
  It is the only component that constructs one. The pipeline is this:

  ```text
  text -> [`assembly::parse`] -> declarations ->⋯

  ⋯-> [`symboltable::build`] -> [`symboltable::resolve`] -> [`symboltable::verify`] ->⋯

  ⋯-> extract instructions -> [`Machine::new`] -> thaw -> write code from address 0
  ```

  Any stage failing aborts the load; there is no partial success and no
  machine to salvage. Instructions are written one per cell in source order,
  and `static_size` records how many leading cells they occupy. Every other
  declaration (labels, allocations, literal values) shapes the symbol table
  but is not itself loaded.

*/

use crate::assembly::{parse, Declaration, Instruction};
use crate::cell::Cell;
use crate::error::LoadError;
use crate::machine::{Machine, MachineConfig};
use crate::symboltable::{build, resolve, verify};

/// Loads a source program, returning the machine in mutable-memory mode with
/// the program counter at 0 and the input queue seeded from `config`.
pub fn load(source: &str, config: &MachineConfig) -> Result<Machine, LoadError> {
  let declarations = parse(source)?;

  let (table, deferred) = build(&declarations);
  let resolved = resolve(&declarations, table)?;
  verify(&declarations, deferred, config)?;

  let instructions = extract_instructions(&declarations);

  let mut machine = Machine::new(config.capacity);
  machine.input.extend(config.input_seed.iter().copied());
  machine.symbols = resolved;
  machine.thaw_memory();

  machine.static_size = instructions.len();
  for (address, instruction) in instructions.into_iter().enumerate() {
    machine.memory.set(address, Cell::Instruction(instruction));
  }

  Ok(machine)
}

/// The flat instruction list in source order; non-code declarations are
/// discarded here, after the analysis stages have seen them.
fn extract_instructions(declarations: &[Declaration]) -> Vec<Instruction> {
  declarations
    .iter()
    .filter_map(|declaration| {
      match declaration {
        Declaration::Instruction(instruction) => Some(instruction.clone()),
        _declaration                          => None
      }
    })
    .collect()
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::assembly::{Opcode, Source, Value};
  use crate::error::{SyntaxError, Violation};

  #[test]
  fn loading_writes_instructions_and_sets_the_static_region() {
    let source = "start: MOVE #1 ACC\nloop: ADD #1 ACC\nJUMP loop\n";
    let machine = load(source, &MachineConfig::default()).unwrap();

    assert_eq!(machine.static_size, 3);
    assert!(!machine.memory.is_frozen());
    assert_eq!(machine.pc, 0);
    assert_eq!(machine.sp, 20);

    // The three instructions sit at addresses 0, 1, 2 in source order.
    let first = machine.memory.get(0).as_instruction().unwrap();
    assert_eq!(first.opcode(), Opcode::Move);
    let second = machine.memory.get(1).as_instruction().unwrap();
    assert_eq!(second.opcode(), Opcode::Add);
    let third = machine.memory.get(2).as_instruction().unwrap();
    assert_eq!(third.opcode(), Opcode::Jump);

    // Everything after the code region is untouched.
    assert!(
      machine.memory.cells()[3..]
        .iter()
        .all(|cell| *cell == Cell::Empty)
    );

    // Labels resolved to the instruction addresses.
    assert_eq!(machine.symbols.address_of(&"loop".into()), Some(1));
  }

  #[test]
  fn the_input_queue_is_seeded_from_the_config() {
    let machine = load("HALT", &MachineConfig::default()).unwrap();
    assert_eq!(machine.input, vec![5]);

    let config = MachineConfig { capacity: 8, input_seed: vec![1, 2, 3] };
    let machine = load("HALT", &config).unwrap();
    assert_eq!(machine.input, vec![1, 2, 3]);
    assert_eq!(machine.memory.capacity(), 8);
    assert_eq!(machine.sp, 8);
  }

  #[test]
  fn directives_are_discarded_by_extraction() {
    let source = ".byte 4\nMOVE #2 ACC\n.value 9\nHALT\n";
    let machine = load(source, &MachineConfig::default()).unwrap();

    assert_eq!(machine.static_size, 2);
    let first = machine.memory.get(0).as_instruction().unwrap();
    assert_eq!(
      *first,
      Instruction::SourceTarget {
        opcode: Opcode::Move,
        source: Source::Immediate(Value::Literal(2)),
        target: crate::assembly::Destination::Register("ACC".into())
      }
    );
  }

  #[test]
  fn a_failed_parse_yields_no_machine() {
    let result = load("HALT\n][", &MachineConfig::default());
    assert!(matches!(
      result,
      Err(LoadError::Syntax(SyntaxError::TrailingInput { .. }))
    ));
  }

  #[test]
  fn an_unresolved_symbol_aborts_the_load() {
    let result = load("JUMP elsewhere", &MachineConfig::default());
    assert!(matches!(result, Err(LoadError::Unresolved { .. })));
  }

  #[test]
  fn a_duplicate_label_aborts_the_load() {
    let result = load("a: NOP\na: HALT", &MachineConfig::default());
    match result {
      Err(LoadError::Verification(violations)) => {
        assert_eq!(
          violations,
          vec![Violation::DuplicateLabel { name: "a".into() }]
        );
      }
      other => panic!("expected a verification error, got {:?}", other)
    }
  }
}
