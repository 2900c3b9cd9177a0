mod cli;

use std::process;

fn main()
{
	env_logger::init();
	process::exit(cli::run());
}
