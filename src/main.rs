use chainfs::shell::{start_shell, Args};
use clap::Parser;

fn main() {
    let args = Args::parse();
    start_shell(args);
}
