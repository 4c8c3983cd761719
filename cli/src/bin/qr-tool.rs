use scriptkit_core::scripts::qr::QrTool;
use scriptkit_core::template;
use std::process::ExitCode;

fn main() -> ExitCode {
    template::main::<QrTool>()
}
