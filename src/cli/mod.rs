use std::fs;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use clap::{Parser, Subcommand};
use log::debug;
use termion::color;
use thiserror::Error;
use simplesim::channel::{InputChannel, StdoutSink};
use simplesim::compiler::{CompileError, Compiler};
use simplesim::interpreter::{Interpreter, RuntimeError};
use simplesim::simple::{self, FrontendError};
use simplesim::simpletron::{self, LoadError, MachineError, Simpletron};
use simplesim::types::Image;

#[derive(Parser)]
#[command(name = "simplesim", about = "Translate and execute Simple programs on the Simpletron machine")]
#[command(args_conflicts_with_subcommands = true, arg_required_else_help = true)]
struct Args
{
	#[command(subcommand)]
	command: Option<Command>,

	/// Source file; the language (Simple vs. SML) is auto-detected
	file: Option<PathBuf>,

	/// Supply an input value up front (repeatable); otherwise inputs are read from stdin
	#[arg(long = "input", value_name = "N", global = true, allow_negative_numbers = true)]
	inputs: Vec<i64>,

	/// Seconds to wait for an interactive input value
	#[arg(long, value_name = "SECONDS", default_value_t = 60, global = true)]
	timeout: u64,
}

#[derive(Subcommand)]
enum Command
{
	/// Compile and interpret a Simple program
	Run
	{
		file: PathBuf,

		/// Print the SML translation before executing
		#[arg(long)]
		show_sml: bool,

		/// Execute the compiled image on the Simpletron instead of interpreting
		#[arg(long)]
		via_sml: bool,
	},

	/// Compile a Simple program and print the SML listing
	Build
	{
		file: PathBuf,
	},

	/// Load and execute an SML memory image
	Exec
	{
		file: PathBuf,
	},
}

// The compound error of the whole embedding. Every stage keeps its own type;
// this wrapper only adds the exit-code mapping of the CLI contract.
#[derive(Debug, Error)]
enum CliError
{
	#[error("{0}")]
	Io(#[from] io::Error),

	#[error("{0}")]
	Frontend(#[from] FrontendError),

	#[error("{0}")]
	Load(#[from] LoadError),

	#[error("{0}")]
	Compile(#[from] CompileError),

	#[error("{0}")]
	Runtime(#[from] RuntimeError),

	#[error("{0}")]
	Machine(#[from] MachineError),
}

impl CliError
{
	// 0 is success; 1 lex/parse (and everything file-shaped), 2 semantic,
	// 3 compilation, 4 interpreter runtime, 5 machine runtime.
	fn exit_code(&self) -> i32
	{
		match self
		{
			CliError::Io(_) 								=> 1,
			CliError::Frontend(FrontendError::Lex(_)) 		=> 1,
			CliError::Frontend(FrontendError::Parse(_)) 	=> 1,
			CliError::Load(_) 								=> 1,
			CliError::Frontend(FrontendError::Semantic(_)) 	=> 2,
			CliError::Compile(_) 							=> 3,
			CliError::Runtime(_) 							=> 4,
			CliError::Machine(_) 							=> 5,
		}
	}
}

pub fn run() -> i32
{
	let args = Args::parse();

	match dispatch(&args)
	{
		Ok(()) => 0,
		Err(error) =>
		{
			report(&error);
			error.exit_code()
		},
	}
}

fn dispatch(args: &Args) -> Result<(), CliError>
{
	match &args.command
	{
		Some(Command::Run { file, show_sml, via_sml }) 	=> run_simple(file, args, *show_sml, *via_sml),
		Some(Command::Build { file }) 					=> build(file),
		Some(Command::Exec { file }) 					=> exec_sml(file, args),
		None =>
		{
			let file = match &args.file
			{
				Some(file) 	=> file,
				None 		=> return Err(CliError::Io(io::Error::new(io::ErrorKind::InvalidInput, "no input file given"))),
			};

			let source = fs::read_to_string(file)?;

			match detect_language(&source)
			{
				Language::Simple =>
				{
					debug!("detected Simple source in {:?}", file);
					run_simple(file, args, false, false)
				},
				Language::Sml =>
				{
					debug!("detected SML source in {:?}", file);
					exec_sml(file, args)
				},
			}
		},
	}
}

fn run_simple(file: &Path, args: &Args, show_sml: bool, via_sml: bool) -> Result<(), CliError>
{
	let source = fs::read_to_string(file)?;
	let (_tokens, program) = simple::compile(&source)?;

	if show_sml || via_sml
	{
		let image = Compiler::new(&program).lower()?;

		if show_sml
		{
			print!("{:}", image);
		}

		if via_sml
		{
			return execute_image(image, args);
		}
	}

	let mut input = make_input(args);
	let mut output = StdoutSink;

	Interpreter::new(&program).run(&mut input, &mut output)?;

	Ok(())
}

fn build(file: &Path) -> Result<(), CliError>
{
	let source = fs::read_to_string(file)?;
	let (_tokens, program) = simple::compile(&source)?;
	let image = Compiler::new(&program).lower()?;

	print!("{:}", image);

	Ok(())
}

fn exec_sml(file: &Path, args: &Args) -> Result<(), CliError>
{
	let source = fs::read_to_string(file)?;
	let image = simpletron::load(&source)?;

	execute_image(image, args)
}

fn execute_image(image: Image, args: &Args) -> Result<(), CliError>
{
	let mut input = make_input(args);
	let mut output = StdoutSink;

	Simpletron::new(image).run(&mut input, &mut output)?;

	Ok(())
}

// Batch inputs come from the command line; otherwise a reader thread feeds
// stdin lines into the channel. Closing stdin wakes a pending read, and the
// channel timeout bounds every wait.
fn make_input(args: &Args) -> InputChannel
{
	if !args.inputs.is_empty()
	{
		return InputChannel::from_values(&args.inputs);
	}

	let (sender, receiver) = crossbeam_channel::unbounded();

	// Only prompt humans, not pipes:
	let prompt = termion::is_tty(&io::stdin());

	thread::spawn(move ||
	{
		let stdin = io::stdin();

		if prompt
		{
			eprint!("? ");
		}

		for line in stdin.lock().lines()
		{
			let line = match line
			{
				Ok(line) 	=> line,
				Err(_) 		=> break,
			};

			if sender.send(line).is_err()
			{
				break;
			}

			if prompt
			{
				eprint!("? ");
			}
		}
	});

	InputChannel::from_receiver(receiver, Duration::from_secs(args.timeout))
}

enum Language
{
	Simple,
	Sml,
}

// The first non-empty line decides: a signed four-digit word (with optional
// address prefix) is SML, a leading decimal line number is Simple.
fn detect_language(source: &str) -> Language
{
	let first = match source.lines().map(str::trim).find(|line| !line.is_empty())
	{
		Some(line) 	=> line,
		None 		=> return Language::Simple,
	};

	let code_part = first.rsplit(':').next().unwrap_or(first).trim();

	if (code_part.starts_with('+') || code_part.starts_with('-'))
		&& (code_part.len() == 5)
		&& code_part[1..].chars().all(|c| c.is_ascii_digit())
	{
		return Language::Sml;
	}

	if let Some(word) = first.split_whitespace().next()
	{
		if word.chars().all(|c| c.is_ascii_digit())
		{
			return Language::Simple;
		}
	}

	Language::Sml
}

fn report(error: &CliError)
{
	if termion::is_tty(&io::stderr())
	{
		eprintln!("{red}error:{reset} {error}",
			red = color::Fg(color::Red),
			reset = color::Fg(color::Reset),
			error = error);
	}
	else
	{
		eprintln!("error: {:}", error);
	}
}
