/*!

  The fetch-decode-execute engine. `step` fetches the cell at the program
  counter as an instruction, advances the counter, and executes; `run` steps
  until `HALT` or a failure. Execution requires the memory to be in its
  mutable mode, which is how the loader hands the machine over.

  Operand evaluation: a source evaluates to an integer; a destination
  evaluates to a *place*, one of the three registers or a memory cell,
  applying any increment/decrement side effect to the addressed location as it
  does. The source of a two-operand instruction is evaluated before the
  destination, and the destination's place is computed once, so a mode like
  `(SP)+` moves the pointer exactly one step per operand occurrence.

  The engine validates every computed address before touching memory and
  reports `OutOfRange` itself; the panics inside `Memory` are unreachable from
  here. Programs that came through the loader have also been verified, so
  register names and increment targets are known good. Executing a hand-built
  instruction that breaks those rules is a precondition violation.

*/

use string_cache::DefaultAtom;

use crate::assembly::{Destination, Instruction, Location, Opcode, Source, Value};
use crate::cell::{Cell, IntegerType};
use crate::error::MachineError;
use crate::machine::Machine;

/// Whether the machine can keep stepping.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Status {
  Running,
  Halted
}

/// A place a destination operand names.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum Place {
  Accumulator,
  StackPointer,
  ProgramCounter,
  Memory(usize)
}

/// Panics if the name is not an architectural register. The verifier
/// guarantees this for loaded programs.
fn register_place(name: &DefaultAtom) -> Place {
  match &name[..] {
    "ACC" => Place::Accumulator,
    "SP"  => Place::StackPointer,
    "PC"  => Place::ProgramCounter,
    _name => {
      unreachable!(
        "Error: An unverified register name reached execution: {}",
        name
      );
    }
  }
}

impl Machine {

  // region Fetch/execute cycle

  /// Executes the instruction under the program counter. Fetching a cell that
  /// does not hold an instruction (running off the end of the code region,
  /// usually) is a `TypeMismatch` failure.
  pub fn step(&mut self) -> Result<Status, MachineError> {
    let address = self.check_address(self.pc as i64)?;
    let instruction = self.memory.get(address).as_instruction()?.clone();

    #[cfg(feature = "trace_computation")]
    println!("M[{}]: {}", address, instruction);

    self.pc += 1;
    self.execute(instruction)
  }

  /// Steps until the program halts. The first failure aborts the run with the
  /// machine state left as the failing instruction found it.
  pub fn run(&mut self) -> Result<(), MachineError> {
    loop {
      if self.step()? == Status::Halted {
        return Ok(());
      }
    }
  }

  fn execute(&mut self, instruction: Instruction) -> Result<Status, MachineError> {
    match instruction {

      Instruction::SourceTarget { opcode, source, target } => {
        let value = self.evaluate_source(&source)?;
        let place = self.evaluate_destination(&target)?;

        let result =
          match opcode {
            Opcode::Move => value,
            Opcode::Add  => self.read_place(place)? + value,
            Opcode::Sub  => self.read_place(place)? - value,
            Opcode::Mult => self.read_place(place)? * value,
            Opcode::Div  => {
              if value == 0 {
                return Err(MachineError::DivisionByZero);
              }
              self.read_place(place)? / value
            }
            _mnemonic => {
              unreachable!("Error: {} executed with a source/target shape.", opcode);
            }
          };

        self.write_place(place, result)?;
        Ok(Status::Running)
      }

      Instruction::SourceOnly { opcode, source } => {
        let value = self.evaluate_source(&source)?;
        match opcode {

          Opcode::Push  => { self.push(value)?; }
          Opcode::Write => { self.output.push(value); }

          _mnemonic => {
            unreachable!("Error: {} executed with a source-only shape.", opcode);
          }

        }
        Ok(Status::Running)
      }

      Instruction::TargetOnly { opcode, target } => {
        let value =
          match opcode {
            Opcode::Pop   => self.pop()?,
            Opcode::Read  => self.input.pop_front().ok_or(MachineError::InputExhausted)?,
            Opcode::Clear => 0,
            _mnemonic => {
              unreachable!("Error: {} executed with a target-only shape.", opcode);
            }
          };

        let place = self.evaluate_destination(&target)?;
        self.write_place(place, value)?;
        Ok(Status::Running)
      }

      Instruction::Transfer { opcode, target } => {
        let target_address = self.check_address(self.value_of(&target)? as i64)?;
        match opcode {

          Opcode::Jump => {
            self.pc = target_address;
          }

          Opcode::Jzero => {
            if self.accumulator.as_integer()? == 0 {
              self.pc = target_address;
            }
          }

          Opcode::Jneg => {
            if self.accumulator.as_integer()? < 0 {
              self.pc = target_address;
            }
          }

          Opcode::Call => {
            let return_address = self.pc as IntegerType;
            self.push(return_address)?;
            self.pc = target_address;
          }

          _mnemonic => {
            unreachable!("Error: {} executed with a transfer shape.", opcode);
          }

        }
        Ok(Status::Running)
      }

      Instruction::Nullary(opcode) => {
        match opcode {

          Opcode::Return => {
            let return_address = self.pop()?;
            self.pc = self.check_pointer(return_address as i64)?;
            Ok(Status::Running)
          }

          Opcode::Halt => Ok(Status::Halted),

          Opcode::Nop => Ok(Status::Running),

          _mnemonic => {
            unreachable!("Error: {} executed with a nullary shape.", opcode);
          }

        }
      }

    }
  }

  // endregion

  // region Operand evaluation

  fn evaluate_source(&mut self, source: &Source) -> Result<IntegerType, MachineError> {
    match source {

      Source::Immediate(value) => self.value_of(value),

      Source::Operand(destination) => {
        let place = self.evaluate_destination(destination)?;
        self.read_place(place)
      }

    }
  }

  fn evaluate_destination(&mut self, destination: &Destination)
    -> Result<Place, MachineError>
  {
    match destination {

      Destination::Register(name) => {
        Ok(register_place(name))
      }

      Destination::Value(value) => {
        let address = self.check_address(self.value_of(value)? as i64)?;
        Ok(Place::Memory(address))
      }

      Destination::Indirect(location) => {
        let address = self.check_address(self.location_value(location)? as i64)?;
        Ok(Place::Memory(address))
      }

      Destination::Indexed(location, offset) => {
        let base = self.location_value(location)? as i64;
        let offset = self.value_of(offset)? as i64;
        let address = self.check_address(base + offset)?;
        Ok(Place::Memory(address))
      }

      Destination::PostIncrement(location) => {
        let address = self.check_address(self.location_value(location)? as i64)?;
        self.adjust_location(location, 1)?;
        Ok(Place::Memory(address))
      }

      Destination::PostDecrement(location) => {
        let address = self.check_address(self.location_value(location)? as i64)?;
        self.adjust_location(location, -1)?;
        Ok(Place::Memory(address))
      }

      Destination::PreIncrement(location) => {
        self.adjust_location(location, 1)?;
        let address = self.check_address(self.location_value(location)? as i64)?;
        Ok(Place::Memory(address))
      }

      Destination::PreDecrement(location) => {
        self.adjust_location(location, -1)?;
        let address = self.check_address(self.location_value(location)? as i64)?;
        Ok(Place::Memory(address))
      }

    }
  }

  /// The current integer a location denotes: a register's contents, or the
  /// value itself for a literal/symbolic location.
  fn location_value(&self, location: &Location) -> Result<IntegerType, MachineError> {
    match location {

      Location::Register(name) => {
        self.read_place(register_place(name))
      }

      Location::Value(value) => self.value_of(value)

    }
  }

  /// Moves the register a location names by `delta`. The verifier has already
  /// rejected increment modes over literal locations.
  fn adjust_location(&mut self, location: &Location, delta: IntegerType)
    -> Result<(), MachineError>
  {
    match location {

      Location::Register(name) => {
        let place = register_place(name);
        let adjusted = self.read_place(place)? + delta;
        self.write_place(place, adjusted)
      }

      Location::Value(value) => {
        unreachable!(
          "Error: An unverified increment of the literal location {} reached execution.",
          value
        );
      }

    }
  }

  fn value_of(&self, value: &Value) -> Result<IntegerType, MachineError> {
    match value {

      Value::Literal(number) => Ok(*number),

      Value::Symbolic(name) => {
        match self.symbols.address_of(name) {
          Some(address) => Ok(address as IntegerType),
          None          => Err(MachineError::UnboundSymbol(name.clone()))
        }
      }

    }
  }

  // endregion

  // region Places and pointers

  fn read_place(&self, place: Place) -> Result<IntegerType, MachineError> {
    match place {
      Place::Accumulator     => self.accumulator.as_integer(),
      Place::StackPointer    => Ok(self.sp as IntegerType),
      Place::ProgramCounter  => Ok(self.pc as IntegerType),
      Place::Memory(address) => self.memory.get(address).as_integer()
    }
  }

  fn write_place(&mut self, place: Place, value: IntegerType)
    -> Result<(), MachineError>
  {
    match place {

      Place::Accumulator => {
        self.accumulator = Cell::Integer(value);
        Ok(())
      }

      Place::StackPointer => {
        self.sp = self.check_pointer(value as i64)?;
        Ok(())
      }

      Place::ProgramCounter => {
        self.pc = self.check_pointer(value as i64)?;
        Ok(())
      }

      Place::Memory(address) => {
        self.memory.set(address, Cell::Integer(value));
        Ok(())
      }

    }
  }

  /// A cell address: `[0, capacity)`.
  fn check_address(&self, address: i64) -> Result<usize, MachineError> {
    let capacity = self.memory.capacity();
    if 0 <= address && (address as usize) < capacity {
      Ok(address as usize)
    } else {
      Err(MachineError::OutOfRange { address, capacity })
    }
  }

  /// A pointer register value: `[0, capacity]`. `SP` rests at `capacity` when
  /// the stack is empty, one past the last cell.
  fn check_pointer(&self, address: i64) -> Result<usize, MachineError> {
    let capacity = self.memory.capacity();
    if 0 <= address && (address as usize) <= capacity {
      Ok(address as usize)
    } else {
      Err(MachineError::OutOfRange { address, capacity })
    }
  }

  fn push(&mut self, value: IntegerType) -> Result<(), MachineError> {
    let address = self.check_address(self.sp as i64 - 1)?;
    self.sp = address;
    self.memory.set(address, Cell::Integer(value));
    Ok(())
  }

  /// Popping an empty stack fails the range check: `SP` already rests one
  /// past the last cell.
  fn pop(&mut self) -> Result<IntegerType, MachineError> {
    let address = self.check_address(self.sp as i64)?;
    let value = self.memory.get(address).as_integer()?;
    self.sp += 1;
    Ok(value)
  }

  // endregion

}
