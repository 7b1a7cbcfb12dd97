mod input;
mod rendering;
mod runtime;
mod shell_state;

pub use runtime::Ui;
