//! Panic handler

use crate::arch;
use core::panic::PanicInfo;

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    if let Some(location) = info.location() {
        println!(
            "\n[Kernel Panic] at {}:{} {}",
            location.file(),
            location.line(),
            info.message()
        );
    } else {
        println!("\n[Kernel Panic] {}", info.message());
    }
    arch::shutdown()
}
