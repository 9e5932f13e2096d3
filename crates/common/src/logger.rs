//! Plain terminal logger shared by every command.

use std::fmt::Display;

use crate::config::global_config;

pub fn intro(name: &str) {
    println!("{name}");
}

pub fn new_empty_line() {
    println!();
}

pub fn info(msg: impl Display) {
    println!("  {msg}");
}

pub fn step(msg: impl Display) {
    println!("> {msg}");
}

pub fn warn(msg: impl Display) {
    eprintln!("warning: {msg}");
}

/// Only printed in verbose mode.
pub fn debug(msg: impl Display) {
    if global_config().verbose {
        println!("  [debug] {msg}");
    }
}

pub fn outro(msg: impl Display) {
    println!("\n{msg}");
}
