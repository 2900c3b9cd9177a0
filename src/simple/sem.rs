use crate::simple::ast::{Program, Statement};
use crate::simple::error::{SemanticError, UndefinedTarget};

// A single pass over the program that checks branch-target closure:
// every GOTO and IF ... GOTO must name a defined line. Unlike the lexer and
// parser, this pass collects all offenders before failing, so a user sees
// every bad target at once. Undeclared variables are fine; they read as 0.
pub struct SemanticAnalyzer<'p>
{
	program: &'p Program,
}

impl<'p> SemanticAnalyzer<'p>
{
	pub fn new(program: &'p Program) -> SemanticAnalyzer<'p>
	{
		SemanticAnalyzer
		{
			program,
		}
	}

	pub fn analyze(&self) -> Result<(), SemanticError>
	{
		let mut targets = vec![];

		for (line, statement) in self.program.statements()
		{
			let target = match statement
			{
				Statement::Goto(target) 			=> *target,
				Statement::IfGoto { target, .. } 	=> *target,
				_ 									=> continue,
			};

			if !self.program.contains_line(target)
			{
				targets.push(UndefinedTarget
				{
					line,
					target,
				});
			}
		}

		if targets.is_empty()
		{
			Ok(())
		}
		else
		{
			Err(SemanticError
			{
				targets,
			})
		}
	}
}
