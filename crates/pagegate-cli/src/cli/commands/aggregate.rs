use pagegate_core::aggregate::aggregate;

use crate::cli::args::AggregateArgs;
use crate::exit_codes;

pub fn run(args: AggregateArgs) -> i32 {
    match aggregate(args.function, &args.values) {
        Ok(value) => {
            println!("{}", value);
            exit_codes::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            exit_codes::CONFIG_ERROR
        }
    }
}
