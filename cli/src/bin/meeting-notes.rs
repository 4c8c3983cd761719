use scriptkit_core::scripts::meeting::MeetingNotes;
use scriptkit_core::template;
use std::process::ExitCode;

fn main() -> ExitCode {
    template::main::<MeetingNotes>()
}
