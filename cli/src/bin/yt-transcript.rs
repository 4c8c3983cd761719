use scriptkit_core::scripts::transcript::YtTranscript;
use scriptkit_core::template;
use std::process::ExitCode;

fn main() -> ExitCode {
    template::main::<YtTranscript>()
}
