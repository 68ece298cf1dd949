use std::io;
use std::process;

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let code = mvrtree_bench::run_main(&args, &mut io::stdout().lock(), &mut io::stderr());

    process::exit(code);
}
