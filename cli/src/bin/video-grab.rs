use scriptkit_core::scripts::video::VideoGrab;
use scriptkit_core::template;
use std::process::ExitCode;

fn main() -> ExitCode {
    template::main::<VideoGrab>()
}
