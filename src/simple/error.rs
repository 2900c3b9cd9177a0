use std::fmt;
use thiserror::Error;

// Lexing is error-prone.
// Every lexer error carries the offending source position.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("[{line}:{column}] {kind}")]
pub struct LexError
{
	pub kind: LexErrorKind,
	pub line: u32,
	pub column: u32,
}

impl LexError
{
	pub fn new(kind: LexErrorKind, line: u32, column: u32) -> LexError
	{
		LexError
		{
			kind,
			line,
			column,
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LexErrorKind
{
	#[error("invalid character '{0}'")]
	InvalidCharacter(char),

	#[error("invalid identifier \"{0}\" (variables are a single lowercase letter)")]
	BadIdentifier(String),

	#[error("invalid operator '!' (use '!=' for inequality)")]
	BareExclamation,

	#[error("number literal is too large")]
	NumberTooLarge,
}

// Parser errors follow the same shape as lexer errors:
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("[{line}:{column}] {kind}")]
pub struct ParseError
{
	pub kind: ParseErrorKind,
	pub line: u32,
	pub column: u32,
}

impl ParseError
{
	pub fn new(kind: ParseErrorKind, line: u32, column: u32) -> ParseError
	{
		ParseError
		{
			kind,
			line,
			column,
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseErrorKind
{
	#[error("expected {expected}, found {found}")]
	UnexpectedToken
	{
		expected: &'static str,
		found: String,
	},

	#[error("expected a line number")]
	MissingLineNumber,

	#[error("line number {line_number} must be greater than the previous one ({previous})")]
	NonIncreasingLineNumber
	{
		line_number: i64,
		previous: i64,
	},

	#[error("line number {0} is already used")]
	DuplicateLineNumber(i64),

	#[error("only one operation is allowed per expression (use intermediate variables)")]
	CompoundExpression,

	#[error("expected 'goto' after the comparison of an IF statement")]
	MissingGoto,

	#[error("number {0} is outside [-9999, 9999]")]
	NumberOutOfRange(i64),

	#[error("line number {0} is not a usable line number")]
	BadLineNumber(i64),
}

// An undefined branch target, reported by the semantic analyzer:
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct UndefinedTarget
{
	pub line: u32,
	pub target: u32,
}

// The semantic analyzer collects every offending target before failing:
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SemanticError
{
	pub targets: Vec<UndefinedTarget>,
}

impl fmt::Display for SemanticError
{
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
	{
		for (index, undefined) in self.targets.iter().enumerate()
		{
			if index > 0
			{
				writeln!(f)?;
			}

			write!(f, "[line {:}] goto target {:} does not exist", undefined.line, undefined.target)?;
		}

		Ok(())
	}
}

impl std::error::Error for SemanticError { }

// This is a compound error type that wraps the whole front-end:
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FrontendError
{
	#[error("{0}")]
	Lex(#[from] LexError),

	#[error("{0}")]
	Parse(#[from] ParseError),

	#[error("{0}")]
	Semantic(#[from] SemanticError),
}
