mod ast;
mod error;
mod lexer;
mod parser;
mod sem;
mod token;

pub use ast::{Expr, Operand, Program, Statement};
pub use error::{FrontendError, LexError, LexErrorKind, ParseError, ParseErrorKind, SemanticError, UndefinedTarget};
pub use lexer::Lexer;
pub use parser::Parser;
pub use sem::SemanticAnalyzer;
pub use token::{BinOp, RelOp, Token, TokenKind};

// Run the whole front-end: tokenize, parse, check branch targets.
// The token list is part of the result so hosts can display it.
pub fn compile(source: &str) -> Result<(Vec<Token>, Program), FrontendError>
{
	let tokens = Lexer::new(source).tokenize()?;
	let program = Parser::new(&tokens).parse_program()?;

	SemanticAnalyzer::new(&program).analyze()?;

	Ok((tokens, program))
}
