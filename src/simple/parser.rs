use std::convert::TryFrom;
use crate::simple::ast::{Expr, Operand, Program, Statement};
use crate::simple::error::{ParseError, ParseErrorKind};
use crate::simple::token::{BinOp, RelOp, Token, TokenKind};
use crate::types::Word;

// The parser walks the token sequence with a cursor and builds the
// line-indexed statement tree. It enforces the line-number invariants
// (strictly increasing, no duplicates) while it goes.
pub struct Parser<'t>
{
	tokens: &'t [Token],
	pos: usize,
}

impl<'t> Parser<'t>
{
	pub fn new(tokens: &'t [Token]) -> Parser<'t>
	{
		Parser
		{
			tokens,
			pos: 0,
		}
	}

	pub fn parse_program(mut self) -> Result<Program, ParseError>
	{
		let mut program = Program::new();
		let mut previous: i64 = 0;

		loop
		{
			// NEWLINEs between lines are tolerated, blank lines included:
			while let TokenKind::Newline = self.current().kind
			{
				self.advance();
			}

			if let TokenKind::Eof = self.current().kind
			{
				break;
			}

			// Every line starts with its line number:
			let token = *self.current();

			let line_number = match token.kind
			{
				TokenKind::LineNumber(number) 	=> number,
				_ 								=> return Err(self.error_at(ParseErrorKind::MissingLineNumber, &token)),
			};

			if line_number <= previous
			{
				let kind = if line_number == previous
				{
					ParseErrorKind::DuplicateLineNumber(line_number)
				}
				else
				{
					ParseErrorKind::NonIncreasingLineNumber
					{
						line_number,
						previous,
					}
				};

				return Err(self.error_at(kind, &token));
			}

			// Line numbers must be positive and fit the program map:
			let line_key = match u32::try_from(line_number)
			{
				Ok(key) if key > 0 	=> key,
				_ 					=> return Err(self.error_at(ParseErrorKind::BadLineNumber(line_number), &token)),
			};

			previous = line_number;
			self.advance();

			let statement = self.parse_statement()?;
			program.insert(line_key, statement);

			// The line must be over now:
			match self.current().kind
			{
				TokenKind::Newline | TokenKind::Eof 	=> (),
				_ 										=> return Err(self.unexpected("end of line")),
			}
		}

		Ok(program)
	}

	fn parse_statement(&mut self) -> Result<Statement, ParseError>
	{
		let token = *self.current();

		match token.kind
		{
			TokenKind::Rem =>
			{
				self.advance();
				Ok(Statement::Rem)
			},
			TokenKind::Input =>
			{
				self.advance();
				Ok(Statement::Input(self.expect_id()?))
			},
			TokenKind::Print =>
			{
				self.advance();
				Ok(Statement::Print(self.expect_id()?))
			},
			TokenKind::Let =>
			{
				self.advance();

				let var = self.expect_id()?;
				self.expect_assign()?;
				let expr = self.parse_expression()?;

				Ok(Statement::Let(var, expr))
			},
			TokenKind::Goto =>
			{
				self.advance();
				Ok(Statement::Goto(self.expect_target()?))
			},
			TokenKind::If =>
			{
				self.advance();

				let left = self.parse_expression()?;
				let op = self.expect_rel_op()?;
				let right = self.parse_expression()?;

				// The conditional jump needs its own 'goto':
				match self.current().kind
				{
					TokenKind::GotoKeyword 	=> self.advance(),
					_ 						=> return Err(self.error_here(ParseErrorKind::MissingGoto)),
				}

				let target = self.expect_target()?;

				Ok(Statement::IfGoto
				{
					left,
					op,
					right,
					target,
				})
			},
			TokenKind::End =>
			{
				self.advance();
				Ok(Statement::End)
			},
			_ => Err(self.unexpected("a statement keyword")),
		}
	}

	// expr := ('+'|'-')? operand (OP_ARITH operand)?
	// Unary '+' is a no-op. Unary '-' lowers to Binary(Number(0), Sub, operand)
	// and thereby uses up the single operation the expression may carry.
	fn parse_expression(&mut self) -> Result<Expr, ParseError>
	{
		if let TokenKind::OpArith(BinOp::Sub) = self.current().kind
		{
			self.advance();

			let operand = self.parse_operand()?;
			self.reject_second_operation()?;

			return Ok(Expr::Binary(Operand::Number(0), BinOp::Sub, operand));
		}

		if let TokenKind::OpArith(BinOp::Add) = self.current().kind
		{
			self.advance();
		}

		let left = self.parse_operand()?;

		match self.current().kind
		{
			TokenKind::OpArith(op) if op != BinOp::Assign =>
			{
				self.advance();

				let right = self.parse_operand()?;
				self.reject_second_operation()?;

				Ok(Expr::Binary(left, op, right))
			},
			_ => Ok(Expr::Leaf(left)),
		}
	}

	fn parse_operand(&mut self) -> Result<Operand, ParseError>
	{
		let token = *self.current();

		match token.kind
		{
			TokenKind::Number(value) =>
			{
				if !Word::in_range(value)
				{
					return Err(self.error_at(ParseErrorKind::NumberOutOfRange(value), &token));
				}

				self.advance();
				Ok(Operand::Number(value as i32))
			},
			TokenKind::Id(name) =>
			{
				self.advance();
				Ok(Operand::Variable(name))
			},
			_ => Err(self.unexpected("a number or a variable")),
		}
	}

	// A completed expression must not be followed by another arithmetic operator:
	fn reject_second_operation(&self) -> Result<(), ParseError>
	{
		match self.current().kind
		{
			TokenKind::OpArith(op) if op != BinOp::Assign 	=> Err(self.error_here(ParseErrorKind::CompoundExpression)),
			_ 												=> Ok(()),
		}
	}

	fn expect_id(&mut self) -> Result<char, ParseError>
	{
		match self.current().kind
		{
			TokenKind::Id(name) =>
			{
				self.advance();
				Ok(name)
			},
			_ => Err(self.unexpected("a variable name")),
		}
	}

	fn expect_assign(&mut self) -> Result<(), ParseError>
	{
		match self.current().kind
		{
			TokenKind::OpArith(BinOp::Assign) =>
			{
				self.advance();
				Ok(())
			},
			_ => Err(self.unexpected("'='")),
		}
	}

	fn expect_rel_op(&mut self) -> Result<RelOp, ParseError>
	{
		match self.current().kind
		{
			TokenKind::OpRel(op) =>
			{
				self.advance();
				Ok(op)
			},
			_ => Err(self.unexpected("a comparison operator")),
		}
	}

	// A branch target is a plain number naming a line:
	fn expect_target(&mut self) -> Result<u32, ParseError>
	{
		let token = *self.current();

		match token.kind
		{
			TokenKind::Number(value) =>
			{
				let target = match u32::try_from(value)
				{
					Ok(target) if target > 0 	=> target,
					_ 							=> return Err(self.error_at(ParseErrorKind::BadLineNumber(value), &token)),
				};

				self.advance();
				Ok(target)
			},
			_ => Err(self.unexpected("a target line number")),
		}
	}

	fn current(&self) -> &Token
	{
		// The lexer guarantees a final EOF token; clamp to it.
		&self.tokens[self.pos.min(self.tokens.len() - 1)]
	}

	fn advance(&mut self)
	{
		if self.pos < self.tokens.len()
		{
			self.pos += 1;
		}
	}

	fn unexpected(&self, expected: &'static str) -> ParseError
	{
		let token = self.current();

		self.error_at(ParseErrorKind::UnexpectedToken
		{
			expected,
			found: format!("{:}", token.kind),
		}, token)
	}

	fn error_here(&self, kind: ParseErrorKind) -> ParseError
	{
		let token = *self.current();
		self.error_at(kind, &token)
	}

	fn error_at(&self, kind: ParseErrorKind, token: &Token) -> ParseError
	{
		ParseError::new(kind, token.line, token.column)
	}
}
