use scriptkit_core::scripts::handwriting::Handwrite;
use scriptkit_core::template;
use std::process::ExitCode;

fn main() -> ExitCode {
    template::main::<Handwrite>()
}
