use scriptkit_core::scripts::history::HistoryJournal;
use scriptkit_core::template;
use std::process::ExitCode;

fn main() -> ExitCode {
    template::main::<HistoryJournal>()
}
