use std::collections::HashMap;
use log::{debug, trace};
use thiserror::Error;
use crate::channel::{InputChannel, InputError, OutputSink, StopSignal};
use crate::simple::{BinOp, Expr, Operand, Program, RelOp, Statement};
use crate::types::{floor_div, floor_rem};

// Runtime faults of the tree interpreter.
// Execution stops at the first one; nothing is retried.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RuntimeError
{
	#[error("[line {line}] division by zero")]
	DivisionByZero
	{
		line: u32,
	},

	#[error("[line {line}] arithmetic overflow")]
	Overflow
	{
		line: u32,
	},

	#[error("[line {line}] goto target {target} does not exist")]
	UndefinedTarget
	{
		line: u32,
		target: u32,
	},

	#[error("[line {line}] input error: {source}")]
	Input
	{
		line: u32,
		source: InputError,
	},
}

// The tree-walking interpreter executes the statement tree directly.
// Its program counter is an index into the ascending list of defined line
// numbers, not a line number itself; GOTO translates through line_to_index.
pub struct Interpreter<'p>
{
	statements: Vec<(u32, &'p Statement)>,
	line_to_index: HashMap<u32, usize>,
	variables: HashMap<char, i64>,
	pc: usize,
	stop: StopSignal,
}

impl<'p> Interpreter<'p>
{
	pub fn new(program: &'p Program) -> Interpreter<'p>
	{
		Interpreter::with_stop_signal(program, StopSignal::new())
	}

	pub fn with_stop_signal(program: &'p Program, stop: StopSignal) -> Interpreter<'p>
	{
		let statements: Vec<_> = program.statements().collect();
		let line_to_index = statements.iter().enumerate().map(|(index, &(line, _))| (line, index)).collect();

		Interpreter
		{
			statements,
			line_to_index,
			variables: HashMap::new(),
			pc: 0,
			stop,
		}
	}

	// Run the program to completion.
	// Termination: END, running past the last line, or a triggered stop signal.
	pub fn run(&mut self, input: &mut InputChannel, output: &mut dyn OutputSink) -> Result<(), RuntimeError>
	{
		debug!("interpreting {:} statements", self.statements.len());

		while self.pc < self.statements.len()
		{
			if self.stop.is_triggered()
			{
				debug!("stop signal observed at pc {:}", self.pc);
				return Ok(());
			}

			let (line, statement) = self.statements[self.pc];
			trace!("pc {:} -> line {:}", self.pc, line);

			match statement
			{
				Statement::Rem =>
				{
					self.pc += 1;
				},
				Statement::Input(var) =>
				{
					let value = input.next_value().map_err(|source| RuntimeError::Input
					{
						line,
						source,
					})?;

					self.variables.insert(*var, value);
					self.pc += 1;
				},
				Statement::Print(var) =>
				{
					output.emit(self.variable(*var));
					self.pc += 1;
				},
				Statement::Let(var, expr) =>
				{
					let value = self.evaluate(expr, line)?;
					self.variables.insert(*var, value);
					self.pc += 1;
				},
				Statement::Goto(target) =>
				{
					self.jump(*target, line)?;
				},
				Statement::IfGoto { left, op, right, target } =>
				{
					if self.compare(left, *op, right, line)?
					{
						self.jump(*target, line)?;
					}
					else
					{
						self.pc += 1;
					}
				},
				Statement::End =>
				{
					break;
				},
			}
		}

		Ok(())
	}

	// Reading a variable that was never assigned yields 0:
	fn variable(&self, name: char) -> i64
	{
		self.variables.get(&name).copied().unwrap_or(0)
	}

	fn jump(&mut self, target: u32, line: u32) -> Result<(), RuntimeError>
	{
		match self.line_to_index.get(&target)
		{
			Some(&index) =>
			{
				self.pc = index;
				Ok(())
			},
			None => Err(RuntimeError::UndefinedTarget
			{
				line,
				target,
			}),
		}
	}

	fn evaluate(&self, expr: &Expr, line: u32) -> Result<i64, RuntimeError>
	{
		match expr
		{
			Expr::Leaf(operand) 			=> Ok(self.operand_value(operand)),
			Expr::Binary(left, op, right) 	=> self.apply(self.operand_value(left), *op, self.operand_value(right), line),
		}
	}

	fn operand_value(&self, operand: &Operand) -> i64
	{
		match operand
		{
			Operand::Number(value) 		=> *value as i64,
			Operand::Variable(name) 	=> self.variable(*name),
		}
	}

	fn apply(&self, left: i64, op: BinOp, right: i64, line: u32) -> Result<i64, RuntimeError>
	{
		let overflow = || RuntimeError::Overflow
		{
			line,
		};

		match op
		{
			BinOp::Add 	=> left.checked_add(right).ok_or_else(overflow),
			BinOp::Sub 	=> left.checked_sub(right).ok_or_else(overflow),
			BinOp::Mul 	=> left.checked_mul(right).ok_or_else(overflow),
			BinOp::Div =>
			{
				if right == 0
				{
					return Err(RuntimeError::DivisionByZero
					{
						line,
					});
				}

				// The only quotient i64 cannot represent:
				if (left == i64::MIN) && (right == -1)
				{
					return Err(overflow());
				}

				Ok(floor_div(left, right))
			},
			BinOp::Mod =>
			{
				if right == 0
				{
					return Err(RuntimeError::DivisionByZero
					{
						line,
					});
				}

				if (left == i64::MIN) && (right == -1)
				{
					return Err(overflow());
				}

				Ok(floor_rem(left, right))
			},

			// Only a LET assignment produces this operator; its value is the right side:
			BinOp::Assign => Ok(right),
		}
	}

	fn compare(&self, left: &Expr, op: RelOp, right: &Expr, line: u32) -> Result<bool, RuntimeError>
	{
		let left = self.evaluate(left, line)?;
		let right = self.evaluate(right, line)?;

		Ok(match op
		{
			RelOp::Equal 			=> left == right,
			RelOp::NotEqual 		=> left != right,
			RelOp::Less 			=> left < right,
			RelOp::LessEqual 		=> left <= right,
			RelOp::Greater 			=> left > right,
			RelOp::GreaterEqual 	=> left >= right,
		})
	}
}
