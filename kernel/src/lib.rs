//! Ember: a small Sv39 RISC-V teaching kernel
//!
//! The library holds the whole kernel. The `ember-kernel` binary only
//! supplies the boot entry; everything below `arch` also builds on the host,
//! where the unit tests run.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

#[macro_use]
pub mod console;
pub mod arch;
pub mod config;
pub mod error;
pub mod fs;
#[cfg(all(not(test), target_os = "none"))]
mod lang_items;
pub mod loader;
pub mod logging;
pub mod mm;
pub mod state;
pub mod sync;
pub mod syscall;
pub mod task;
pub mod trap;

/// Bring the machine up and hand it to the scheduler
#[cfg(target_os = "none")]
pub fn kernel_main() -> ! {
    use fs::RamFs;
    use mm::{BuddyAllocator, KernelLayout};
    use state::KernelState;

    clear_bss();
    logging::init();
    println!("[kernel] Hello, Ember!");
    mm::heap::init_heap();

    let layout = KernelLayout::from_linker();
    let mut frames = BuddyAllocator::new();
    frames.add_region(layout.ekernel, layout.memory_end);
    log::info!(
        "frames: [{:#x}, {:#x}), {} bytes",
        layout.ekernel,
        layout.memory_end,
        frames.total()
    );

    let fs = RamFs::with_files(loader::apps::embedded_apps());
    for name in fs.names() {
        log::info!("app: {}", name);
    }
    let state = KernelState::new(frames, layout, fs);
    state.kernel_space.activate();
    log::info!("paging: kernel space active");
    state::install(state);

    trap::init();
    if let Err(err) = state::kernel().spawn_root("initproc") {
        panic!("cannot start initproc: {}", err);
    }
    task::run_tasks()
}

#[cfg(target_os = "none")]
fn clear_bss() {
    extern "C" {
        fn sbss();
        fn ebss();
    }
    unsafe {
        core::slice::from_raw_parts_mut(sbss as usize as *mut u8, ebss as usize - sbss as usize)
            .fill(0);
    }
}
