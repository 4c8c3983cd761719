use scriptkit_core::scripts::mdtable::MarkdownTable;
use scriptkit_core::template;
use std::process::ExitCode;

fn main() -> ExitCode {
    template::main::<MarkdownTable>()
}
