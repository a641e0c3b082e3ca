fn main() {
    hs_cli::init_logging();
    let exit_code = hs_cli::run_cli_from_args(std::env::args_os());
    std::process::exit(exit_code);
}
