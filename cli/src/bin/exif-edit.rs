use scriptkit_core::scripts::exif::ExifEdit;
use scriptkit_core::template;
use std::process::ExitCode;

fn main() -> ExitCode {
    template::main::<ExifEdit>()
}
