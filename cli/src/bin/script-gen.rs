use scriptkit_core::scripts::scriptgen::ScriptGen;
use scriptkit_core::template;
use std::process::ExitCode;

fn main() -> ExitCode {
    template::main::<ScriptGen>()
}
