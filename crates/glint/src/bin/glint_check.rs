//! glint-check - Check glint source files.

fn main() -> std::process::ExitCode {
    glint::cmd::check::main()
}
