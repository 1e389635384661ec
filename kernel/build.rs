//! Builds the user programs and embeds them in the kernel image.
//!
//! Only runs for the bare-metal target; host builds (unit tests) carry no
//! user programs.

use std::env;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

const TARGET: &str = "riscv64gc-unknown-none-elf";

/// Programs linked into the kernel, in the order the filesystem lists them
const APPS: [&str; 8] = [
    "initproc", "shell", "hello", "filetest", "forktest", "ls", "power_3", "power_5",
];

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=src/linker.ld");
    println!("cargo:rerun-if-changed=../user/src");
    println!("cargo:rerun-if-env-changed=LOG");

    if env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("none") {
        return;
    }

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    println!(
        "cargo:rustc-link-arg-bins=-T{}",
        manifest_dir.join("src/linker.ld").display()
    );

    let user_dir = manifest_dir.join("../user");
    let status = Command::new(env::var("CARGO").unwrap_or_else(|_| "cargo".into()))
        .args(["build", "--release", "--target", TARGET])
        .current_dir(&user_dir)
        .env_remove("RUSTFLAGS")
        .env_remove("CARGO_ENCODED_RUSTFLAGS")
        .status()
        .expect("failed to run cargo for the user programs");
    if !status.success() {
        panic!("building the user programs failed");
    }

    let bin_dir = user_dir.join("target").join(TARGET).join("release");
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    insert_app_data(&bin_dir, &out_dir.join("link_apps.S")).unwrap();
}

/// Emit `_num_app`, the app boundaries, `_app_names` and the `.incbin`s
fn insert_app_data(bin_dir: &Path, asm_path: &Path) -> io::Result<()> {
    let mut f = File::create(asm_path)?;
    writeln!(f, "    .align 3")?;
    writeln!(f, "    .section .data")?;
    writeln!(f, "    .global _num_app")?;
    writeln!(f, "_num_app:")?;
    writeln!(f, "    .quad {}", APPS.len())?;
    for i in 0..APPS.len() {
        writeln!(f, "    .quad app_{}_start", i)?;
    }
    writeln!(f, "    .quad app_{}_end", APPS.len() - 1)?;

    writeln!(f, "    .global _app_names")?;
    writeln!(f, "_app_names:")?;
    for app in APPS {
        writeln!(f, "    .string \"{}\"", app)?;
    }

    for (i, app) in APPS.iter().enumerate() {
        let elf = bin_dir.join(app);
        if !elf.exists() {
            panic!("user program {} not found at {}", app, elf.display());
        }
        println!("cargo:rerun-if-changed={}", elf.display());
        writeln!(f, "    .section .data")?;
        writeln!(f, "    .global app_{}_start", i)?;
        writeln!(f, "    .global app_{}_end", i)?;
        writeln!(f, "    .align 3")?;
        writeln!(f, "app_{}_start:", i)?;
        writeln!(f, "    .incbin \"{}\"", elf.display())?;
        writeln!(f, "app_{}_end:", i)?;
    }
    Ok(())
}
