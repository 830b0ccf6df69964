use std::{collections::BTreeMap, env, fs, path::PathBuf};

fn parse_number(value: &str) -> Result<u64, std::num::ParseIntError> {
    let clean = value.trim().replace('_', "");
    match clean.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => clean.parse(),
    }
}

fn main() {
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    let flags_path = PathBuf::from(manifest_dir).join("../../flags.json");
    let flags_str = fs::read_to_string(&flags_path)
        .unwrap_or_else(|err| panic!("Error reading {}: {}", flags_path.display(), err));
    let flagmap: BTreeMap<String, String> = serde_json::from_str(&flags_str)
        .unwrap_or_else(|err| panic!("Malformed {}: {}", flags_path.display(), err));
    make_flags(&flagmap);
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=../../flags.json");
}

fn make_flags(flagmap: &BTreeMap<String, String>) {
    let mut s = String::from("");
    for (key, value) in flagmap {
        let value = parse_number(value)
            .unwrap_or_else(|err| panic!("Flag '{}' is not a number: {}", key, err));
        s += format!("pub const {}: usize = {:#x};\n", key, value).as_str();
    }
    let out_dir = env::var("OUT_DIR").unwrap();
    let path = PathBuf::from(out_dir).join("build_flags.rs");
    fs::write(path, s).unwrap();
}
