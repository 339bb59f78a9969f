mod handler;
mod utils;

pub use handler::ConsoleSession;
