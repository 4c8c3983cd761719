use scriptkit_core::scripts::resume::ResumeParse;
use scriptkit_core::template;
use std::process::ExitCode;

fn main() -> ExitCode {
    template::main::<ResumeParse>()
}
