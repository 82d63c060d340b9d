fn main() -> std::process::ExitCode {
    barkeep_cli::run()
}
