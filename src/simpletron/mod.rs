mod loader;

pub use loader::{load, LoadError};

use log::{debug, trace};
use thiserror::Error;
use crate::channel::{InputChannel, InputError, OutputSink, StopSignal};
use crate::types::{floor_div, Image, Instruction, Opcode, Word, MEMORY_WORDS};

// Runtime faults of the Simpletron.
// The machine stops at the first one and reports the fault address.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MachineError
{
	#[error("[address {address:02}] unknown instruction")]
	UnknownInstruction
	{
		address: usize,
	},

	#[error("[address {address:02}] division by zero")]
	DivideByZero
	{
		address: usize,
	},

	#[error("[address {address:02}] accumulator overflow")]
	AccumulatorOverflow
	{
		address: usize,
	},

	#[error("[address {address:02}] input error: {source}")]
	Input
	{
		address: usize,
		source: InputError,
	},

	#[error("[address {address:02}] input value {value} is outside [-9999, 9999]")]
	InputOutOfRange
	{
		address: usize,
		value: i64,
	},

	#[error("ran off the end of memory without reaching HALT")]
	RanOffEnd,
}

// The Simpletron: one accumulator, an instruction counter and 100 words of
// memory. It executes one instruction per step; READ is the only step that
// can suspend (on the input channel).
pub struct Simpletron
{
	memory: [Word; MEMORY_WORDS],
	accumulator: Word,
	instruction_counter: usize,
	stop: StopSignal,
}

impl Simpletron
{
	pub fn new(image: Image) -> Simpletron
	{
		Simpletron::with_stop_signal(image, StopSignal::new())
	}

	pub fn with_stop_signal(image: Image, stop: StopSignal) -> Simpletron
	{
		Simpletron
		{
			memory: image.0,
			accumulator: Word(0),
			instruction_counter: 0,
			stop,
		}
	}

	pub fn memory(&self) -> &[Word]
	{
		&self.memory
	}

	pub fn accumulator(&self) -> Word
	{
		self.accumulator
	}

	// The decode/execute loop.
	// It ends on HALT, on a triggered stop signal, or with an error when the
	// instruction counter walks past the last memory word.
	pub fn run(&mut self, input: &mut InputChannel, output: &mut dyn OutputSink) -> Result<(), MachineError>
	{
		debug!("starting execution at address 00");

		while self.instruction_counter < MEMORY_WORDS
		{
			if self.stop.is_triggered()
			{
				debug!("stop signal observed at address {:02}", self.instruction_counter);
				return Ok(());
			}

			let address = self.instruction_counter;
			let word = self.memory[address];

			let instruction = match Instruction::decode(word)
			{
				Some(instruction) 	=> instruction,
				None 				=> return Err(MachineError::UnknownInstruction
				{
					address,
				}),
			};

			trace!("{:02}: {:}", address, instruction);

			if let Opcode::Halt = instruction.opcode
			{
				return Ok(());
			}

			self.execute(instruction, address, input, output)?;
		}

		Err(MachineError::RanOffEnd)
	}

	fn execute(&mut self, instruction: Instruction, address: usize, input: &mut InputChannel, output: &mut dyn OutputSink) -> Result<(), MachineError>
	{
		let cell = instruction.operand.0 as usize;

		match instruction.opcode
		{
			Opcode::Read =>
			{
				let value = input.next_value().map_err(|source| MachineError::Input
				{
					address,
					source,
				})?;

				if !Word::in_range(value)
				{
					return Err(MachineError::InputOutOfRange
					{
						address,
						value,
					});
				}

				self.memory[cell] = Word(value as i16);
				self.instruction_counter += 1;
			},
			Opcode::Write =>
			{
				output.emit(self.memory[cell].0 as i64);
				self.instruction_counter += 1;
			},
			Opcode::Load =>
			{
				self.accumulator = self.memory[cell];
				self.instruction_counter += 1;
			},
			Opcode::Store =>
			{
				self.memory[cell] = self.accumulator;
				self.instruction_counter += 1;
			},
			Opcode::Add =>
			{
				self.arithmetic(address, cell, |acc, value| acc + value)?;
			},
			Opcode::Subtract =>
			{
				self.arithmetic(address, cell, |acc, value| acc - value)?;
			},
			Opcode::Multiply =>
			{
				self.arithmetic(address, cell, |acc, value| acc * value)?;
			},
			Opcode::Divide =>
			{
				let divisor = self.memory[cell].0;

				if divisor == 0
				{
					return Err(MachineError::DivideByZero
					{
						address,
					});
				}

				// Flooring division; the quotient of two words is always a word again.
				self.accumulator = Word(floor_div(self.accumulator.0 as i64, divisor as i64) as i16);
				self.instruction_counter += 1;
			},
			Opcode::Branch =>
			{
				self.instruction_counter = cell;
			},
			Opcode::BranchNeg =>
			{
				if self.accumulator < Word(0)
				{
					self.instruction_counter = cell;
				}
				else
				{
					self.instruction_counter += 1;
				}
			},
			Opcode::BranchZero =>
			{
				if self.accumulator == Word(0)
				{
					self.instruction_counter = cell;
				}
				else
				{
					self.instruction_counter += 1;
				}
			},

			// HALT never reaches execute(); the run loop handles it.
			Opcode::Halt => (),
		}

		Ok(())
	}

	// ADD, SUBTRACT and MULTIPLY share the accumulator bound check.
	// The intermediate result fits an i32 comfortably (|9999 * 9999| < 2^31).
	fn arithmetic(&mut self, address: usize, cell: usize, op: fn(i32, i32) -> i32) -> Result<(), MachineError>
	{
		let result = op(self.accumulator.0 as i32, self.memory[cell].0 as i32);

		if !Word::in_range(result as i64)
		{
			return Err(MachineError::AccumulatorOverflow
			{
				address,
			});
		}

		self.accumulator = Word(result as i16);
		self.instruction_counter += 1;

		Ok(())
	}
}

#[cfg(test)]
mod tests
{
	use super::*;

	fn image(words: &[i16]) -> Image
	{
		let mut image = Image::zeroed();

		for (address, &value) in words.iter().enumerate()
		{
			image.0[address] = Word(value);
		}

		image
	}

	fn run(words: &[i16], inputs: &[i64]) -> Result<Vec<i64>, MachineError>
	{
		let mut machine = Simpletron::new(image(words));
		let mut input = InputChannel::from_values(inputs);
		let mut output = vec![];

		machine.run(&mut input, &mut output)?;

		Ok(output)
	}

	#[test]
	fn read_write_roundtrip()
	{
		// READ 07; WRITE 07; HALT:
		assert_eq!(run(&[1007, 1107, 4300], &[42]).unwrap(), vec![42]);
	}

	#[test]
	fn sum_image_runs()
	{
		// The canonical sum example:
		let words = [1007, 1008, 2007, 3008, 2109, 1109, 4300];

		assert_eq!(run(&words, &[3, 4]).unwrap(), vec![7]);
	}

	#[test]
	fn store_writes_the_accumulator()
	{
		// LOAD 04; STORE 05; WRITE 05; HALT; cell 04 holds 99:
		assert_eq!(run(&[2004, 2105, 1105, 4300, 99], &[]).unwrap(), vec![99]);
	}

	#[test]
	fn branch_jumps_unconditionally()
	{
		// BRANCH 02 skips the WRITE at 01:
		assert_eq!(run(&[4002, 1104, 4300], &[]).unwrap(), Vec::<i64>::new());
	}

	#[test]
	fn branchneg_tests_the_sign()
	{
		// LOAD 05; BRANCHNEG 04; WRITE 06; HALT; HALT; cells: 05 = -1, 06 = 7.
		// The negative accumulator takes the branch past the WRITE:
		let negative = [2005, 4104, 1106, 4300, 4300, -1, 7];

		assert_eq!(run(&negative, &[]).unwrap(), Vec::<i64>::new());

		// With a positive value the branch falls through and the WRITE runs:
		let positive = [2005, 4104, 1106, 4300, 4300, 1, 7];

		assert_eq!(run(&positive, &[]).unwrap(), vec![7]);
	}

	#[test]
	fn branchzero_on_zero_accumulator()
	{
		// LOAD 04 (0); BRANCHZERO 03; WRITE 05; HALT:
		assert_eq!(run(&[2004, 4203, 1105, 4300, 0, 7], &[]).unwrap(), Vec::<i64>::new());
	}

	#[test]
	fn divide_floors()
	{
		// LOAD 05 (-7); DIVIDE 06 (2); STORE 07; WRITE 07; HALT:
		let words = [2005, 3206, 2107, 1107, 4300, -7, 2, 0];

		assert_eq!(run(&words, &[]).unwrap(), vec![-4]);
	}

	#[test]
	fn divide_by_zero_fails()
	{
		let error = run(&[2004, 3205, 4300, 0, 5, 0], &[]).unwrap_err();

		assert_eq!(error, MachineError::DivideByZero
		{
			address: 1,
		});
	}

	#[test]
	fn accumulator_overflow_fails()
	{
		// LOAD 03 (9999); ADD 03; never reached HALT:
		let error = run(&[2003, 3003, 4300, 9999], &[]).unwrap_err();

		assert_eq!(error, MachineError::AccumulatorOverflow
		{
			address: 1,
		});
	}

	#[test]
	fn multiply_overflow_fails()
	{
		let error = run(&[2003, 3303, 4300, 100], &[]).unwrap_err();

		assert_eq!(error, MachineError::AccumulatorOverflow
		{
			address: 1,
		});
	}

	#[test]
	fn unknown_instruction_reports_the_address()
	{
		// Opcode 99 does not exist:
		let error = run(&[9901], &[]).unwrap_err();

		assert_eq!(error, MachineError::UnknownInstruction
		{
			address: 0,
		});
	}

	#[test]
	fn exhausted_input_fails()
	{
		let error = run(&[1007, 4300], &[]).unwrap_err();

		assert_eq!(error, MachineError::Input
		{
			address: 0,
			source: InputError::Exhausted,
		});
	}

	#[test]
	fn out_of_range_input_fails()
	{
		let error = run(&[1007, 4300], &[10000]).unwrap_err();

		assert_eq!(error, MachineError::InputOutOfRange
		{
			address: 0,
			value: 10000,
		});
	}

	#[test]
	fn running_off_the_end_fails()
	{
		// A memory full of zero words never halts; opcode 00 is unknown though,
		// so craft a memory of LOAD 00 everywhere instead:
		let mut full = Image::zeroed();

		for address in 0..MEMORY_WORDS
		{
			full.0[address] = Word(2000);
		}

		let mut machine = Simpletron::new(full);
		let mut input = InputChannel::empty();
		let mut output = vec![];

		assert_eq!(machine.run(&mut input, &mut output), Err(MachineError::RanOffEnd));
	}

	#[test]
	fn zero_word_is_not_an_instruction()
	{
		// An all-zero memory fails immediately at address 00:
		let error = run(&[], &[]).unwrap_err();

		assert_eq!(error, MachineError::UnknownInstruction
		{
			address: 0,
		});
	}

	#[test]
	fn stop_signal_terminates_cleanly()
	{
		// BRANCH 00 loops forever without the signal:
		let stop = StopSignal::new();
		stop.trigger();

		let mut machine = Simpletron::with_stop_signal(image(&[4000]), stop);
		let mut input = InputChannel::empty();
		let mut output = vec![];

		assert_eq!(machine.run(&mut input, &mut output), Ok(()));
	}

	#[test]
	fn store_is_observable_in_memory()
	{
		// READ 05; HALT:
		let mut machine = Simpletron::new(image(&[1005, 4300]));
		let mut input = InputChannel::from_values(&[-123]);
		let mut output = vec![];

		machine.run(&mut input, &mut output).unwrap();

		assert_eq!(machine.memory()[5], Word(-123));
	}
}
