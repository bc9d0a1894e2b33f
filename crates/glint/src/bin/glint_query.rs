//! glint-query - Query a glint source file at a position.

fn main() -> std::process::ExitCode {
    glint::cmd::query::main()
}
