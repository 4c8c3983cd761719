use scriptkit_core::scripts::article::ArticlePod;
use scriptkit_core::template;
use std::process::ExitCode;

fn main() -> ExitCode {
    template::main::<ArticlePod>()
}
