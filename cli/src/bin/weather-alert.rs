use scriptkit_core::scripts::weather::WeatherAlert;
use scriptkit_core::template;
use std::process::ExitCode;

fn main() -> ExitCode {
    template::main::<WeatherAlert>()
}
