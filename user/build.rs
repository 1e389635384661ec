use std::env;
use std::path::PathBuf;

fn main() {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    println!("cargo:rerun-if-changed=src/linker.ld");
    println!(
        "cargo:rustc-link-arg-bins=-T{}",
        manifest_dir.join("src/linker.ld").display()
    );
}
