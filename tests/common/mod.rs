#![allow(dead_code)]

pub mod hack;

use vm_translator::{translate_to_string, Options, Unit};

pub fn translate(units: &[(&str, &str)], bootstrap: bool) -> String {
    let units: Vec<Unit> = units.iter().map(|(name, src)| Unit::new(name, src)).collect();
    let options = Options {
        bootstrap,
        ..Options::default()
    };
    translate_to_string(&units, options).expect("translation")
}
